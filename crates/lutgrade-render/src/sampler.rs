//! Packed-LUT sampling.
//!
//! The per-pixel algorithm, shared verbatim by the CPU and GPU paths:
//!
//! 1. `scaled = clamp(rgb, 0, 1) * (N - 1)`
//! 2. blue picks two slices: `b_low = floor(scaled.b)`,
//!    `b_high = min(b_low + 1, N - 1)`, blend `t = scaled.b - b_low`
//! 3. per slice, bilinear-tap the packed texture at
//!    `u = (scaled.r + slice*N + 0.5) / N^2`, `v = (scaled.g + 0.5) / N`
//! 4. output = `lerp(tap_low, tap_high, t)`, alpha untouched
//!
//! The `+0.5` texel-center offsets and the `N^2` vs `N` denominators are
//! load-bearing; off-by-half-texel errors show up as banding at grid
//! boundaries, not as crashes.

use lutgrade_core::PackedLut;
use rayon::prelude::*;

use crate::{Rgba8Image, RenderError, RenderResult};

/// Default cap on the longest edge the sampler will accept without
/// downscaling, mirroring a typical GPU 2D texture limit.
pub const DEFAULT_MAX_TEXTURE_SIZE: u32 = 4096;

/// Available sampling backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// CPU path using rayon. Always available.
    #[default]
    Cpu,
    /// wgpu compute path (requires the `wgpu` feature).
    Wgpu,
}

enum Engine {
    Cpu,
    #[cfg(feature = "wgpu")]
    Gpu(crate::gpu::GpuSampler),
}

/// Applies packed LUTs to images.
///
/// Holds the backend and the platform texture-size limit. Inputs whose
/// longest edge exceeds the limit are downsampled (aspect-preserving)
/// before sampling — a hard platform constraint, not a quality choice.
pub struct Sampler {
    engine: Engine,
    max_texture_size: u32,
}

impl Sampler {
    /// Creates a CPU sampler with the default texture-size limit.
    pub fn new() -> Self {
        Self {
            engine: Engine::Cpu,
            max_texture_size: DEFAULT_MAX_TEXTURE_SIZE,
        }
    }

    /// Creates a sampler on the requested backend.
    pub fn with_backend(backend: Backend) -> RenderResult<Self> {
        match backend {
            Backend::Cpu => Ok(Self::new()),
            Backend::Wgpu => {
                #[cfg(feature = "wgpu")]
                {
                    let gpu = crate::gpu::GpuSampler::new()?;
                    let max_texture_size = gpu.max_texture_size();
                    Ok(Self {
                        engine: Engine::Gpu(gpu),
                        max_texture_size,
                    })
                }
                #[cfg(not(feature = "wgpu"))]
                {
                    Err(RenderError::BackendNotAvailable(
                        "wgpu feature not enabled".to_string(),
                    ))
                }
            }
        }
    }

    /// Overrides the longest-edge limit (mainly for tests).
    pub fn with_max_texture_size(mut self, max: u32) -> Self {
        self.max_texture_size = max;
        self
    }

    /// The longest-edge limit currently in force.
    pub fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    /// Applies `lut` to `image`, returning the graded image.
    ///
    /// The output matches the input dimensions unless the input exceeded
    /// the texture-size limit, in which case it matches the downscaled
    /// dimensions. Alpha passes through unchanged.
    pub fn apply(&self, image: &Rgba8Image, lut: &PackedLut) -> RenderResult<Rgba8Image> {
        let safe;
        let src = if image.longest_edge() > self.max_texture_size {
            safe = image.fit_within(self.max_texture_size);
            &safe
        } else {
            image
        };

        match &self.engine {
            Engine::Cpu => Ok(apply_cpu(src, lut)),
            #[cfg(feature = "wgpu")]
            Engine::Gpu(gpu) => gpu.apply(src, lut),
        }
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

/// One bilinear tap on the packed texture at normalized `(u, v)`,
/// clamp-to-edge, texel-center convention.
#[inline]
fn tap(lut: &PackedLut, u: f32, v: f32) -> [f32; 3] {
    let w = lut.width as i64;
    let h = lut.height as i64;

    let x = u * lut.width as f32 - 0.5;
    let y = v * lut.height as f32 - 0.5;
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let xi0 = (x0 as i64).clamp(0, w - 1) as usize;
    let xi1 = (x0 as i64 + 1).clamp(0, w - 1) as usize;
    let yi0 = (y0 as i64).clamp(0, h - 1) as usize;
    let yi1 = (y0 as i64 + 1).clamp(0, h - 1) as usize;

    let texel = |x: usize, y: usize| -> [f32; 3] {
        let i = (y * lut.width + x) * 4;
        [
            lut.texture[i] as f32 / 255.0,
            lut.texture[i + 1] as f32 / 255.0,
            lut.texture[i + 2] as f32 / 255.0,
        ]
    };

    let t00 = texel(xi0, yi0);
    let t10 = texel(xi1, yi0);
    let t01 = texel(xi0, yi1);
    let t11 = texel(xi1, yi1);

    let mut out = [0.0_f32; 3];
    for ch in 0..3 {
        let top = t00[ch] + fx * (t10[ch] - t00[ch]);
        let bot = t01[ch] + fx * (t11[ch] - t01[ch]);
        out[ch] = top + fy * (bot - top);
    }
    out
}

/// Grades a single RGBA pixel.
#[inline]
fn grade_pixel(px: [u8; 4], lut: &PackedLut) -> [u8; 4] {
    let n = lut.size as f32;
    let scale = n - 1.0;

    let r = (px[0] as f32 / 255.0).clamp(0.0, 1.0) * scale;
    let g = (px[1] as f32 / 255.0).clamp(0.0, 1.0) * scale;
    let b = (px[2] as f32 / 255.0).clamp(0.0, 1.0) * scale;

    let b_low = b.floor();
    let b_high = (b_low + 1.0).min(scale);
    let t = b - b_low;

    let v = (g + 0.5) / n;
    let u_low = (r + b_low * n + 0.5) / (n * n);
    let u_high = (r + b_high * n + 0.5) / (n * n);

    let lo = tap(lut, u_low, v);
    let hi = tap(lut, u_high, v);

    let mut out = [0u8; 4];
    for ch in 0..3 {
        let v = lo[ch] + t * (hi[ch] - lo[ch]);
        out[ch] = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    out[3] = px[3];
    out
}

fn apply_cpu(image: &Rgba8Image, lut: &PackedLut) -> Rgba8Image {
    let row_bytes = image.width as usize * 4;
    let mut out = Rgba8Image::new(image.width, image.height);

    out.pixels
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..image.width {
                let graded = grade_pixel(image.pixel(x, y as u32), lut);
                let i = x as usize * 4;
                row[i..i + 4].copy_from_slice(&graded);
            }
        });

    out
}
