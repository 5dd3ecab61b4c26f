mod common;

use std::sync::Arc;

use asset_cache_engine::error::{Error, Result};
use asset_cache_engine::mesh::chunked::{CodecGeometry, GeometryCodec};
use asset_cache_engine::mesh::decoder::MeshDecoder;
use asset_cache_engine::mesh::{is_mesh_payload, obj};

/// Codec stub returning a canned geometry regardless of payload.
struct FixedCodec(CodecGeometry);

impl GeometryCodec for FixedCodec {
    fn decode(&self, _payload: &[u8]) -> Result<CodecGeometry> {
        Ok(self.0.clone())
    }
}

fn chunk(tag: &str, version: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = [0u8; 8].to_vec();
    out[..tag.len()].copy_from_slice(tag.as_bytes());
    out.extend((version).to_le_bytes());
    out.extend((payload.len() as u32).to_le_bytes());
    if version == 2 {
        out.extend((payload.len() as u32).to_le_bytes());
    }
    out.extend_from_slice(payload);
    out
}

fn chunked_mesh(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = b"version 6.00\n".to_vec();
    for c in chunks {
        out.extend_from_slice(c);
    }
    out
}

fn lods_payload(offsets: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(0u16.to_le_bytes());
    out.push(0u8);
    out.extend((offsets.len() as u32).to_le_bytes());
    for o in offsets {
        out.extend(o.to_le_bytes());
    }
    out
}

fn quad_geometry() -> CodecGeometry {
    CodecGeometry {
        positions: vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ],
        normals: vec![[0.0, 0.0, 1.0]; 4],
        uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        faces: vec![[0, 1, 2], [0, 2, 3]],
    }
}

#[test]
fn test_mesh_payload_detection() {
    assert!(is_mesh_payload(b"version 2.00\n..."));
    assert!(!is_mesh_payload(b"\x89PNG\r\n\x1a\n...."));
    assert!(!is_mesh_payload(b"version "));
}

#[test]
fn test_decode_v1_text() {
    let data = b"version 1.00\n1\n\
        [0,0,0][0,0,1][0.25,0.75,0][1,0,0][0,0,1][1,0,0][0,1,0][0,0,1][0,1,0]\n";
    let mesh = MeshDecoder::new().decode(data).unwrap();

    assert_eq!(mesh.vertices.len(), 3);
    assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    assert_eq!(mesh.vertices[1], [1.0, 0.0, 0.0]);
    // V is flipped into image orientation.
    assert_eq!(mesh.uvs[0], [0.25, 0.25, 0.0]);
}

#[test]
fn test_decode_v1_incomplete_triangle_dropped() {
    // Four vertices: one full triangle, one leftover vertex.
    let data = b"version 1.00\n1\n\
        [0,0,0][0,0,1][0,0,0][1,0,0][0,0,1][0,0,0][0,1,0][0,0,1][0,0,0][2,2,2][0,0,1][0,0,0]\n";
    let mesh = MeshDecoder::new().decode(data).unwrap();
    assert_eq!(mesh.vertices.len(), 4);
    assert_eq!(mesh.faces.len(), 1);
}

#[test]
fn test_decode_binary_roundtrip() {
    let data = common::binary_mesh(
        &[
            ([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.25]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ],
        &[[0, 1, 2]],
        None,
    );
    let mesh = MeshDecoder::new().decode(&data).unwrap();

    assert_eq!(mesh.version.major, 2);
    assert_eq!(mesh.vertices, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    assert_eq!(mesh.normals[0], [0.0, 0.0, 1.0]);
    assert_eq!(mesh.uvs[0], [0.0, 0.75, 0.0]);
    assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    assert!(mesh.lods.is_empty());
}

#[test]
fn test_decode_binary_with_lods() {
    let verts = [
        ([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        ([1.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
    ];
    let faces = [[0, 1, 2], [1, 3, 2], [0, 2, 3], [0, 3, 1]];
    let data = common::binary_mesh(&verts, &faces, Some(&[0, 2]));
    let mesh = MeshDecoder::new().decode(&data).unwrap();

    assert_eq!(mesh.faces.len(), 4);
    assert_eq!(mesh.lods, vec![0..2, 2..4]);
    assert_eq!(mesh.lod_faces(0), &faces[..2]);
    assert_eq!(mesh.lod_faces(1), &faces[2..]);
    // Out-of-range level falls back to the full face list.
    assert_eq!(mesh.lod_faces(9).len(), 4);
}

#[test]
fn test_decode_binary_face_index_out_of_range() {
    let data = common::binary_mesh(
        &[
            ([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        ],
        &[[0, 1, 7]],
        None,
    );
    let err = MeshDecoder::new().decode(&data).unwrap_err();
    assert!(matches!(err, Error::MalformedAsset(_)));
}

#[test]
fn test_decode_binary_counts_exceed_payload() {
    // Header declares far more vertices than the buffer holds.
    let mut data = b"version 3.00\n".to_vec();
    data.extend(12u16.to_le_bytes());
    data.extend(0u16.to_le_bytes());
    data.extend(100_000u32.to_le_bytes());
    data.extend(10u32.to_le_bytes());
    data.extend([0u8; 64]);

    let err = MeshDecoder::new().decode(&data).unwrap_err();
    assert!(matches!(err, Error::MalformedAsset(_)));
}

#[test]
fn test_decode_unsupported_version() {
    let err = MeshDecoder::new().decode(b"version 9.00\nwhatever").unwrap_err();
    assert!(matches!(err, Error::MalformedAsset(_)));
}

#[test]
fn test_decode_non_mesh_payload() {
    assert!(MeshDecoder::new().decode(b"\x89PNG\r\n\x1a\n....").is_err());
    assert!(MeshDecoder::new().decode(b"").is_err());
}

#[test]
fn test_decode_chunked_with_codec() {
    let data = chunked_mesh(&[chunk("COREMESH", 2, b"opaque-geometry")]);
    let decoder = MeshDecoder::with_codec(Arc::new(FixedCodec(quad_geometry())));
    let mesh = decoder.decode(&data).unwrap();

    assert_eq!(mesh.version.major, 6);
    assert_eq!(mesh.vertices.len(), 4);
    // The codec's winding order is reversed on the way out.
    assert_eq!(mesh.faces, vec![[0, 2, 1], [0, 3, 2]]);
    assert_eq!(mesh.uvs[2], [1.0, 0.0, 0.0]);
}

#[test]
fn test_decode_chunked_with_lods() {
    let data = chunked_mesh(&[
        chunk("COREMESH", 2, b"opaque"),
        chunk("LODS", 1, &lods_payload(&[0, 1])),
    ]);
    let decoder = MeshDecoder::with_codec(Arc::new(FixedCodec(quad_geometry())));
    let mesh = decoder.decode(&data).unwrap();

    assert_eq!(mesh.lods, vec![0..1, 1..2]);
    assert_eq!(mesh.lod_faces(0), &[[0, 2, 1]]);
}

#[test]
fn test_decode_chunked_bad_lods_keeps_full_mesh() {
    // A LODS chunk too short for its declared offsets is ignored.
    let data = chunked_mesh(&[
        chunk("COREMESH", 2, b"opaque"),
        chunk("LODS", 1, &[0u8, 0, 0, 9, 0, 0, 0]),
    ]);
    let decoder = MeshDecoder::with_codec(Arc::new(FixedCodec(quad_geometry())));
    let mesh = decoder.decode(&data).unwrap();

    assert!(mesh.lods.is_empty());
    assert_eq!(mesh.faces.len(), 2);
}

#[test]
fn test_decode_chunked_fills_missing_attributes() {
    let geometry = CodecGeometry {
        positions: vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        normals: Vec::new(),
        uvs: Vec::new(),
        faces: vec![[0, 1, 2]],
    };
    let data = chunked_mesh(&[chunk("COREMESH", 2, b"opaque")]);
    let mesh = MeshDecoder::with_codec(Arc::new(FixedCodec(geometry)))
        .decode(&data)
        .unwrap();

    assert_eq!(mesh.normals, vec![[0.0; 3]; 3]);
    assert_eq!(mesh.uvs, vec![[0.0; 3]; 3]);
}

#[test]
fn test_decode_chunked_without_codec() {
    let data = chunked_mesh(&[chunk("COREMESH", 2, b"opaque")]);
    let err = MeshDecoder::new().decode(&data).unwrap_err();
    assert!(matches!(err, Error::MalformedAsset(_)));
}

#[test]
fn test_decode_chunked_truncated_chunk() {
    // Declared payload size runs past the end of the data.
    let mut data = chunked_mesh(&[chunk("COREMESH", 2, b"opaque-geometry")]);
    data.truncate(data.len() - 4);
    let decoder = MeshDecoder::with_codec(Arc::new(FixedCodec(quad_geometry())));
    let err = decoder.decode(&data).unwrap_err();
    assert!(matches!(err, Error::MalformedAsset(_)));
}

#[test]
fn test_decode_chunked_missing_coremesh() {
    let data = chunked_mesh(&[chunk("LODS", 1, &lods_payload(&[0, 1]))]);
    let decoder = MeshDecoder::with_codec(Arc::new(FixedCodec(quad_geometry())));
    assert!(decoder.decode(&data).is_err());
}

#[test]
fn test_obj_output() {
    let data = common::binary_mesh(
        &[
            ([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ],
        &[[0, 1, 2]],
        None,
    );
    let mesh = MeshDecoder::new().decode(&data).unwrap();
    let obj = obj::to_obj_string(&mesh);

    assert!(obj.contains("v 0.000000 0.000000 0.000000"));
    assert!(obj.contains("vn 0.000000 0.000000 1.000000"));
    // Face indices are 1-based.
    assert!(obj.contains("f 1/1/1 2/2/2 3/3/3"));
}

#[test]
fn test_obj_uses_highest_quality_lod() {
    let verts = [
        ([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        ([1.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
    ];
    let faces = [[0, 1, 2], [1, 3, 2], [0, 2, 3], [0, 3, 1]];
    let data = common::binary_mesh(&verts, &faces, Some(&[0, 2]));
    let mesh = MeshDecoder::new().decode(&data).unwrap();

    let obj = obj::to_obj_string(&mesh);
    let face_lines = obj.lines().filter(|l| l.starts_with("f ")).count();
    assert_eq!(face_lines, 2);
}
