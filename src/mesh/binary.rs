// Plain mesh encodings: the v1 text layout and the v2-v5 binary layout.

use tracing::warn;

use crate::error::{Error, Result};
use crate::mesh::decoder::{MeshVersion, NormalizedMesh};
use crate::mesh::reader::ByteReader;

/// Bytes per vertex in the binary layout: position 3xf32, normal 3xf32,
/// uv 2xf32, tangent 4xi8, color 4xu8.
const VERTEX_SIZE: usize = 40;
/// Bytes per face: three u32 vertex indices.
const FACE_SIZE: usize = 12;
/// Version marker plus trailing newline.
pub(crate) const MARKER_SIZE: usize = 13;

/// Decode the v1 text layout. Line 3 holds concatenated `[x,y,z]`
/// triple groups — position, normal, uv per vertex — and faces are
/// implicit: every three vertex groups form one triangle.
pub(crate) fn decode_v1(data: &[u8], version: MeshVersion) -> Result<NormalizedMesh> {
    let text = std::str::from_utf8(data)
        .map_err(|_| Error::MalformedAsset("v1 mesh is not valid UTF-8".to_string()))?;
    let mut lines = text.lines();
    let _marker = lines.next();
    let _counts = lines.next();
    let payload = lines
        .next()
        .ok_or_else(|| Error::MalformedAsset("v1 mesh has no data line".to_string()))?;

    // Adjacent groups arrive as `][` — normalize into a JSON array.
    let normalized = format!("[{}]", payload.replace("][", "],["));
    let groups: Vec<Vec<f64>> = serde_json::from_str(&normalized)
        .map_err(|e| Error::MalformedAsset(format!("v1 vertex data unparseable: {}", e)))?;

    if groups.len() % 3 != 0 {
        return Err(Error::MalformedAsset(format!(
            "v1 mesh group count {} is not a multiple of 3",
            groups.len()
        )));
    }

    let vertex_count = groups.len() / 3;
    let mut mesh = NormalizedMesh::empty(version);
    for i in 0..vertex_count {
        let pos = triple(&groups[i * 3])?;
        let norm = triple(&groups[i * 3 + 1])?;
        let uv = triple(&groups[i * 3 + 2])?;
        mesh.vertices.push(pos);
        mesh.normals.push(norm);
        mesh.uvs.push([uv[0], 1.0 - uv[1], uv[2]]);
    }

    // Trailing vertices that do not complete a triangle are dropped.
    let face_count = vertex_count / 3;
    for f in 0..face_count {
        let base = (f * 3) as u32;
        mesh.faces.push([base, base + 1, base + 2]);
    }

    Ok(mesh)
}

fn triple(group: &[f64]) -> Result<[f32; 3]> {
    if group.len() < 3 {
        return Err(Error::MalformedAsset(format!(
            "v1 vertex group has {} component(s), expected 3",
            group.len()
        )));
    }
    Ok([group[0] as f32, group[1] as f32, group[2] as f32])
}

/// Decode the v2-v5 binary layout.
///
/// After the marker: u16 header_size, u16 lod_type, u32 num_verts,
/// u32 num_faces. When lod_type != 0 the first two bytes of the
/// remaining header carry u16 num_lods; the rest is skipped. Vertices
/// are 40 bytes each, faces 12. When present, a trailing array of
/// num_lods u32 face-offsets yields the LOD ranges.
pub(crate) fn decode_binary(data: &[u8], version: MeshVersion) -> Result<NormalizedMesh> {
    let mut r = ByteReader::at(data, MARKER_SIZE);

    let header_size = r.u16()? as usize;
    let lod_type = r.u16()?;
    let num_verts = r.u32()? as usize;
    let num_faces = r.u32()? as usize;

    let extra = header_size.saturating_sub(12);
    let mut num_lods = 0usize;
    if lod_type != 0 && extra >= 2 {
        let mut header = ByteReader::at(data, r.pos());
        num_lods = header.u16()? as usize;
    }
    r.skip(extra)?;

    // Guard the declared counts against the buffer before allocating.
    let needed = num_verts
        .checked_mul(VERTEX_SIZE)
        .and_then(|v| num_faces.checked_mul(FACE_SIZE).map(|f| v + f))
        .ok_or_else(|| Error::MalformedAsset("mesh counts overflow".to_string()))?;
    if r.remaining() < needed {
        return Err(Error::MalformedAsset(format!(
            "declared {} vertices / {} faces exceed payload size",
            num_verts, num_faces
        )));
    }

    let mut mesh = NormalizedMesh::empty(version);
    mesh.vertices.reserve(num_verts);
    mesh.normals.reserve(num_verts);
    mesh.uvs.reserve(num_verts);

    for _ in 0..num_verts {
        let px = r.f32()?;
        let py = r.f32()?;
        let pz = r.f32()?;
        let nx = r.f32()?;
        let ny = r.f32()?;
        let nz = r.f32()?;
        let tu = r.f32()?;
        let tv = r.f32()?;
        // Tangent and color are carried in the file but not in the
        // normalized representation.
        r.skip(8)?;
        mesh.vertices.push([px, py, pz]);
        mesh.normals.push([nx, ny, nz]);
        mesh.uvs.push([tu, 1.0 - tv, 0.0]);
    }

    mesh.faces.reserve(num_faces);
    for _ in 0..num_faces {
        let a = r.u32()?;
        let b = r.u32()?;
        let c = r.u32()?;
        if a as usize >= num_verts || b as usize >= num_verts || c as usize >= num_verts {
            return Err(Error::MalformedAsset(format!(
                "face index ({}, {}, {}) out of range for {} vertices",
                a, b, c, num_verts
            )));
        }
        mesh.faces.push([a, b, c]);
    }

    if lod_type != 0 && num_lods >= 2 {
        mesh.lods = read_lod_offsets(&mut r, num_lods, num_faces);
    }

    Ok(mesh)
}

/// Read the trailing LOD face-offset array into ordered ranges. A
/// malformed block is tolerated: the mesh keeps its full face list.
fn read_lod_offsets(
    r: &mut ByteReader<'_>,
    num_lods: usize,
    num_faces: usize,
) -> Vec<std::ops::Range<u32>> {
    let mut offsets = Vec::with_capacity(num_lods);
    for _ in 0..num_lods {
        match r.u32() {
            Ok(v) => offsets.push(v),
            Err(_) => {
                warn!("truncated LOD offset table, keeping full mesh");
                return Vec::new();
            }
        }
    }
    build_lod_ranges(&offsets, num_faces)
}

/// Consecutive offsets become face-index ranges. Offsets must be
/// non-decreasing and within the face count.
pub(crate) fn build_lod_ranges(offsets: &[u32], num_faces: usize) -> Vec<std::ops::Range<u32>> {
    let faces = num_faces as u32;
    let monotonic = offsets.windows(2).all(|w| w[0] <= w[1]);
    if !monotonic || offsets.iter().any(|&o| o > faces) {
        warn!("inconsistent LOD offsets {:?}, keeping full mesh", offsets);
        return Vec::new();
    }

    let mut ranges: Vec<std::ops::Range<u32>> = offsets
        .windows(2)
        .map(|w| w[0]..w[1])
        .filter(|range| !range.is_empty())
        .collect();
    if let Some(&last) = offsets.last() {
        if last < faces {
            ranges.push(last..faces);
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lod_ranges_from_offsets() {
        let ranges = build_lod_ranges(&[0, 10, 30], 30);
        assert_eq!(ranges, vec![0..10, 10..30]);
    }

    #[test]
    fn test_lod_ranges_open_tail() {
        let ranges = build_lod_ranges(&[0, 10], 25);
        assert_eq!(ranges, vec![0..10, 10..25]);
    }

    #[test]
    fn test_lod_ranges_rejects_non_monotonic() {
        assert!(build_lod_ranges(&[10, 0], 30).is_empty());
        assert!(build_lod_ranges(&[0, 99], 30).is_empty());
    }
}
