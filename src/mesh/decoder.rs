// Version dispatch: one decode contract over every supported marker.

use std::ops::Range;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::mesh::chunked::GeometryCodec;
use crate::mesh::{binary, chunked};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshVersion {
    pub major: u8,
    pub minor: u8,
}

impl std::fmt::Display for MeshVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}

/// Format-agnostic decoded mesh. Faces are 0-based index triples;
/// `lods` is an ordered sequence of face-index ranges, highest quality
/// first, so a consumer can render a reduced mesh without re-decoding.
#[derive(Debug, Clone)]
pub struct NormalizedMesh {
    pub version: MeshVersion,
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// (u, v, w) with V already flipped into image orientation.
    pub uvs: Vec<[f32; 3]>,
    pub faces: Vec<[u32; 3]>,
    pub lods: Vec<Range<u32>>,
}

impl NormalizedMesh {
    pub(crate) fn empty(version: MeshVersion) -> Self {
        Self {
            version,
            vertices: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            faces: Vec::new(),
            lods: Vec::new(),
        }
    }

    /// Faces of one LOD level. Falls back to the full face list when the
    /// mesh carries no LOD data or the level is out of range.
    pub fn lod_faces(&self, level: usize) -> &[[u32; 3]] {
        match self.lods.get(level) {
            Some(range) => {
                let start = (range.start as usize).min(self.faces.len());
                let end = (range.end as usize).min(self.faces.len());
                &self.faces[start..end]
            }
            None => &self.faces,
        }
    }
}

/// Pure decoder over raw mesh bytes. Holds an optional codec for the
/// compressed v6/v7 geometry; without one those payloads fail with
/// `MalformedAsset` and the asset stays cached-but-unpreviewable.
#[derive(Clone, Default)]
pub struct MeshDecoder {
    codec: Option<Arc<dyn GeometryCodec>>,
}

impl MeshDecoder {
    pub fn new() -> Self {
        Self { codec: None }
    }

    pub fn with_codec(codec: Arc<dyn GeometryCodec>) -> Self {
        Self { codec: Some(codec) }
    }

    /// Decode a mesh payload, dispatching on its embedded version
    /// marker. Supported: plain v1-v5, compressed v6/v7.
    pub fn decode(&self, data: &[u8]) -> Result<NormalizedMesh> {
        let version = parse_version_marker(data)?;
        debug!("decoding mesh version {}", version);

        match version.major {
            1 => binary::decode_v1(data, version),
            2..=5 => binary::decode_binary(data, version),
            6 | 7 => chunked::decode_chunked(data, version, self.codec.as_deref()),
            _ => Err(Error::MalformedAsset(format!(
                "unsupported mesh version {}",
                version
            ))),
        }
    }
}

/// The first 12 bytes carry an ASCII `version X.YY` marker.
fn parse_version_marker(data: &[u8]) -> Result<MeshVersion> {
    if data.len() < 12 {
        return Err(Error::MalformedAsset(
            "mesh payload too small for version marker".to_string(),
        ));
    }
    let marker = std::str::from_utf8(&data[..12])
        .map_err(|_| Error::MalformedAsset("version marker is not ASCII".to_string()))?;
    let number = marker
        .strip_prefix("version ")
        .ok_or_else(|| Error::MalformedAsset(format!("unknown version marker {:?}", marker)))?;
    let (major, minor) = number
        .trim()
        .split_once('.')
        .ok_or_else(|| Error::MalformedAsset(format!("unparseable version {:?}", number)))?;
    let major: u8 = major
        .parse()
        .map_err(|_| Error::MalformedAsset(format!("unparseable version {:?}", number)))?;
    let minor: u8 = minor
        .parse()
        .map_err(|_| Error::MalformedAsset(format!("unparseable version {:?}", number)))?;
    Ok(MeshVersion { major, minor })
}
