// Wavefront OBJ output for decoded meshes.

use crate::mesh::decoder::NormalizedMesh;

/// Render a decoded mesh as OBJ text. When LOD data is present only the
/// first (highest quality) range is emitted, matching what a viewer
/// should display by default. Indices are 1-based per the OBJ format.
pub fn to_obj_string(mesh: &NormalizedMesh) -> String {
    let faces = if mesh.lods.is_empty() {
        &mesh.faces[..]
    } else {
        mesh.lod_faces(0)
    };

    let mut out = String::new();
    out.push_str("# Converted mesh\n");
    out.push_str(&format!(
        "# Vertices: {}, Faces: {}\n\n",
        mesh.vertices.len(),
        faces.len()
    ));

    for v in &mesh.vertices {
        out.push_str(&format!("v {:.6} {:.6} {:.6}\n", v[0], v[1], v[2]));
    }
    out.push('\n');
    for n in &mesh.normals {
        out.push_str(&format!("vn {:.6} {:.6} {:.6}\n", n[0], n[1], n[2]));
    }
    out.push('\n');
    for uv in &mesh.uvs {
        out.push_str(&format!("vt {:.6} {:.6} {:.6}\n", uv[0], uv[1], uv[2]));
    }
    out.push('\n');
    for face in faces {
        let (a, b, c) = (face[0] + 1, face[1] + 1, face[2] + 1);
        out.push_str(&format!("f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}\n"));
    }

    out
}
