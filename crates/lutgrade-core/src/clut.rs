//! `.clut` binary container format.
//!
//! A `.clut` file is the packed texture plus a fixed 32-byte header,
//! all little-endian:
//!
//! | offset | bytes | field |
//! |--------|-------|---------------------------|
//! | 0      | 4     | magic tag `"CLUT"`        |
//! | 4      | 2     | format version (u16, = 1) |
//! | 6      | 2     | grid size N (u16)         |
//! | 8      | 12    | domain_min (3 x f32)      |
//! | 20     | 12    | domain_max (3 x f32)      |
//! | 32     | 4*N^3 | packed RGBA8 texture      |
//!
//! A payload shorter than the header declares is corrupt; a longer one
//! is tolerated by truncating to the expected length, so future versions
//! may append trailing data.

use crate::{CoreError, CoreResult, PackedLut};

/// Magic tag at the start of every `.clut` file.
pub const MAGIC: [u8; 4] = *b"CLUT";

/// Current format version.
pub const VERSION: u16 = 1;

/// Header length in bytes.
pub const HEADER_LEN: usize = 32;

/// Serializes a packed LUT into the `.clut` container.
pub fn encode(packed: &PackedLut) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + packed.texture.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(packed.size as u16).to_le_bytes());
    for v in packed.domain_min {
        out.extend_from_slice(&v.to_le_bytes());
    }
    for v in packed.domain_max {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&packed.texture);
    out
}

/// Deserializes a `.clut` container.
///
/// Fails with [`CoreError::InvalidFormat`] on a bad magic tag or
/// unsupported version, and [`CoreError::CorruptData`] when the payload
/// is shorter than `size` requires.
pub fn decode(bytes: &[u8]) -> CoreResult<PackedLut> {
    if bytes.len() < HEADER_LEN {
        return Err(CoreError::CorruptData {
            expected: HEADER_LEN,
            actual: bytes.len(),
        });
    }
    if bytes[0..4] != MAGIC {
        return Err(CoreError::InvalidFormat("bad magic tag".into()));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(CoreError::InvalidFormat(format!(
            "unsupported version {version}"
        )));
    }

    let size = u16::from_le_bytes([bytes[6], bytes[7]]) as usize;
    if size < 2 {
        return Err(CoreError::InvalidFormat(format!("bad grid size {size}")));
    }

    let domain_min = read_vec3(&bytes[8..20]);
    let domain_max = read_vec3(&bytes[20..32]);

    let expected = size * size * size * 4;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() < expected {
        return Err(CoreError::CorruptData {
            expected,
            actual: payload.len(),
        });
    }

    Ok(PackedLut {
        size,
        width: size * size,
        height: size,
        // Trailing bytes beyond the expected length are padding.
        texture: payload[..expected].to_vec(),
        domain_min,
        domain_max,
    })
}

fn read_vec3(bytes: &[u8]) -> [f32; 3] {
    let mut out = [0.0_f32; 3];
    for (i, slot) in out.iter_mut().enumerate() {
        let chunk: [u8; 4] = bytes[i * 4..i * 4 + 4].try_into().unwrap();
        *slot = f32::from_le_bytes(chunk);
    }
    out
}
