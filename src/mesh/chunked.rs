// The v6/v7 chunked container. Geometry lives in a compressed COREMESH
// chunk decoded through a pluggable codec; LODS carries face ranges.

use tracing::warn;

use crate::error::{Error, Result};
use crate::mesh::binary::{build_lod_ranges, MARKER_SIZE};
use crate::mesh::decoder::{MeshVersion, NormalizedMesh};
use crate::mesh::reader::ByteReader;

const CHUNK_TAG_SIZE: usize = 8;
const COREMESH_TAG: &str = "COREMESH";
const LODS_TAG: &str = "LODS";

/// Canonical arrays produced by a compressed-geometry codec. Normals
/// and UVs are optional attributes of the encoded stream.
#[derive(Debug, Clone, Default)]
pub struct CodecGeometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub faces: Vec<[u32; 3]>,
}

/// Decoder for the compressed geometry payload inside a COREMESH chunk.
pub trait GeometryCodec: Send + Sync {
    fn decode(&self, payload: &[u8]) -> Result<CodecGeometry>;
}

/// Walk the chunk stream and normalize the contained geometry. Without
/// a codec, compressed payloads are cached-but-unpreviewable.
pub(crate) fn decode_chunked(
    data: &[u8],
    version: MeshVersion,
    codec: Option<&dyn GeometryCodec>,
) -> Result<NormalizedMesh> {
    let mut r = ByteReader::at(data, MARKER_SIZE);
    let mut coremesh: Option<&[u8]> = None;
    let mut lod_payload: Option<&[u8]> = None;

    while r.remaining() >= CHUNK_TAG_SIZE + 8 {
        let tag_bytes = r.take(CHUNK_TAG_SIZE)?;
        let tag = String::from_utf8_lossy(tag_bytes)
            .trim_end_matches('\0')
            .to_string();
        let chunk_version = r.u32()?;
        let chunk_size = r.u32()?;
        // Version-2 chunks carry a separate payload size.
        let data_size = if chunk_version == 2 {
            r.u32()?
        } else {
            chunk_size
        };

        let payload = r.take(data_size as usize).map_err(|_| {
            Error::MalformedAsset(format!(
                "chunk {} declares {} bytes beyond end of payload",
                tag, data_size
            ))
        })?;

        match tag.as_str() {
            COREMESH_TAG if chunk_version == 2 => coremesh = Some(payload),
            LODS_TAG => lod_payload = Some(payload),
            _ => {}
        }
    }

    let coremesh =
        coremesh.ok_or_else(|| Error::MalformedAsset("no COREMESH chunk found".to_string()))?;
    let codec = codec.ok_or_else(|| {
        Error::MalformedAsset("compressed geometry codec unavailable".to_string())
    })?;

    let geometry = codec.decode(coremesh)?;
    let num_verts = geometry.positions.len();
    if num_verts == 0 {
        return Err(Error::MalformedAsset(
            "compressed geometry has no vertices".to_string(),
        ));
    }

    let mut mesh = NormalizedMesh::empty(version);
    mesh.vertices = geometry.positions;

    if geometry.normals.len() == num_verts {
        mesh.normals = geometry.normals;
    } else {
        if !geometry.normals.is_empty() {
            warn!(
                "normal count mismatch ({} vs {} vertices)",
                geometry.normals.len(),
                num_verts
            );
        }
        mesh.normals = vec![[0.0; 3]; num_verts];
    }

    if geometry.uvs.len() == num_verts {
        mesh.uvs = geometry
            .uvs
            .into_iter()
            .map(|[u, v]| [u, 1.0 - v, 0.0])
            .collect();
    } else {
        if !geometry.uvs.is_empty() {
            warn!(
                "uv count mismatch ({} vs {} vertices)",
                geometry.uvs.len(),
                num_verts
            );
        }
        mesh.uvs = vec![[0.0; 3]; num_verts];
    }

    mesh.faces.reserve(geometry.faces.len());
    for [a, b, c] in geometry.faces {
        if a as usize >= num_verts || b as usize >= num_verts || c as usize >= num_verts {
            return Err(Error::MalformedAsset(format!(
                "face index ({}, {}, {}) out of range for {} vertices",
                a, b, c, num_verts
            )));
        }
        // The codec emits the opposite winding order.
        mesh.faces.push([a, c, b]);
    }

    if let Some(payload) = lod_payload {
        mesh.lods = parse_lod_chunk(payload, mesh.faces.len());
    }

    Ok(mesh)
}

/// LODS payload: u16 lod_type, u8 high-quality count, u32 offset count,
/// then the face-offset array. Malformed data keeps the full mesh.
fn parse_lod_chunk(payload: &[u8], num_faces: usize) -> Vec<std::ops::Range<u32>> {
    let mut r = ByteReader::new(payload);
    let parsed = (|| -> Result<Vec<u32>> {
        let _lod_type = r.u16()?;
        let _high_quality = r.u8()?;
        let num_offsets = r.u32()? as usize;
        let mut offsets = Vec::with_capacity(num_offsets);
        for _ in 0..num_offsets {
            offsets.push(r.u32()?);
        }
        Ok(offsets)
    })();

    match parsed {
        Ok(offsets) if offsets.len() >= 2 => build_lod_ranges(&offsets, num_faces),
        Ok(_) => Vec::new(),
        Err(e) => {
            warn!("LODS chunk unparseable, keeping full mesh: {}", e);
            Vec::new()
        }
    }
}
