// Mesh decoding — proprietary mesh payloads to a portable representation.

pub mod binary;
pub mod chunked;
pub mod decoder;
pub mod obj;
mod reader;

pub use chunked::{CodecGeometry, GeometryCodec};
pub use decoder::{MeshDecoder, MeshVersion, NormalizedMesh};

/// Quick check for the ASCII version marker every mesh payload starts with.
pub fn is_mesh_payload(data: &[u8]) -> bool {
    data.len() >= 12 && data.starts_with(b"version ")
}
