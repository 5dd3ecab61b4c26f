// Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install the test log subscriber once per test binary. Honors
/// `RUST_LOG` so a failing run can be re-examined with full output.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Minimal PNG: magic followed by filler so size checks have something
/// to measure.
pub fn png_bytes(filler: usize) -> Vec<u8> {
    let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
    out.extend(std::iter::repeat(0x42u8).take(filler));
    out
}

/// Compressed-texture stand-in: KTX magic plus filler.
pub fn ktx_bytes(filler: usize) -> Vec<u8> {
    let mut out = b"\xABKTX 11\xBB\r\n\x1a\n".to_vec();
    out.extend(std::iter::repeat(0x17u8).take(filler));
    out
}

/// One vertex of the binary mesh layout: position, normal, uv.
pub type BinVertex = ([f32; 3], [f32; 3], [f32; 2]);

/// Assemble a version-2 binary mesh payload. Each vertex is 40 bytes
/// (position, normal, uv, then tangent and color filler); faces are
/// u32 index triples. `lod_offsets`, when given, switches the header
/// to the LOD variant and appends the face-offset array.
pub fn binary_mesh(
    vertices: &[BinVertex],
    faces: &[[u32; 3]],
    lod_offsets: Option<&[u32]>,
) -> Vec<u8> {
    let mut out = b"version 2.00\n".to_vec();

    let (header_size, lod_type): (u16, u16) = match lod_offsets {
        Some(_) => (14, 1),
        None => (12, 0),
    };
    out.extend(header_size.to_le_bytes());
    out.extend(lod_type.to_le_bytes());
    out.extend((vertices.len() as u32).to_le_bytes());
    out.extend((faces.len() as u32).to_le_bytes());
    if let Some(offsets) = lod_offsets {
        out.extend((offsets.len() as u16).to_le_bytes());
    }

    for (pos, norm, uv) in vertices {
        for c in pos.iter().chain(norm.iter()) {
            out.extend(c.to_le_bytes());
        }
        for c in uv {
            out.extend(c.to_le_bytes());
        }
        out.extend([0u8; 8]); // tangent + color
    }
    for face in faces {
        for i in face {
            out.extend(i.to_le_bytes());
        }
    }
    if let Some(offsets) = lod_offsets {
        for o in offsets {
            out.extend(o.to_le_bytes());
        }
    }
    out
}
