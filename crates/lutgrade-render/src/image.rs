//! RGBA8 image container.
//!
//! Pixels are stored row-major, top-to-bottom, interleaved
//! `[R G B A R G B A ...]`.

use crate::{RenderError, RenderResult};

/// An owned RGBA8 image buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Rgba8Image {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Interleaved RGBA bytes, `width * height * 4` long.
    pub pixels: Vec<u8>,
}

impl Rgba8Image {
    /// Creates a black, fully transparent image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    /// Wraps an existing pixel buffer, validating its length.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> RenderResult<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if pixels.len() != expected {
            return Err(RenderError::InvalidImage(format!(
                "{}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// Pixel at `(x, y)` as `[r, g, b, a]`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }

    /// Longest edge in pixels.
    #[inline]
    pub fn longest_edge(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Bilinear resize to exact target dimensions.
    pub fn resize(&self, dst_width: u32, dst_height: u32) -> Rgba8Image {
        let mut out = Rgba8Image::new(dst_width.max(1), dst_height.max(1));
        let sx = self.width as f32 / out.width as f32;
        let sy = self.height as f32 / out.height as f32;

        for dy in 0..out.height {
            for dx in 0..out.width {
                let fx = dx as f32 * sx;
                let fy = dy as f32 * sy;
                let x0 = (fx as u32).min(self.width - 1);
                let y0 = (fy as u32).min(self.height - 1);
                let x1 = (x0 + 1).min(self.width - 1);
                let y1 = (y0 + 1).min(self.height - 1);
                let ffx = fx - x0 as f32;
                let ffy = fy - y0 as f32;

                let p00 = self.pixel(x0, y0);
                let p10 = self.pixel(x1, y0);
                let p01 = self.pixel(x0, y1);
                let p11 = self.pixel(x1, y1);

                let base = ((dy * out.width + dx) * 4) as usize;
                for ch in 0..4 {
                    let top = p00[ch] as f32 + ffx * (p10[ch] as f32 - p00[ch] as f32);
                    let bot = p01[ch] as f32 + ffx * (p11[ch] as f32 - p01[ch] as f32);
                    out.pixels[base + ch] = (top + ffy * (bot - top)).round() as u8;
                }
            }
        }
        out
    }

    /// Downscales (aspect-preserving) so the longest edge fits `max_edge`.
    ///
    /// Returns a borrowed-equivalent clone untouched when the image
    /// already fits; never upscales.
    pub fn fit_within(&self, max_edge: u32) -> Rgba8Image {
        let longest = self.longest_edge();
        if longest <= max_edge {
            return self.clone();
        }
        let ratio = max_edge as f32 / longest as f32;
        let w = ((self.width as f32 * ratio).round() as u32).max(1);
        let h = ((self.height as f32 * ratio).round() as u32).max(1);
        self.resize(w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_pixels_validates_length() {
        assert!(Rgba8Image::from_pixels(2, 2, vec![0; 15]).is_err());
        assert!(Rgba8Image::from_pixels(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn fit_within_preserves_aspect() {
        let img = Rgba8Image::new(400, 200);
        let small = img.fit_within(100);
        assert_eq!((small.width, small.height), (100, 50));
    }

    #[test]
    fn fit_within_never_upscales() {
        let img = Rgba8Image::new(40, 20);
        let same = img.fit_within(100);
        assert_eq!((same.width, same.height), (40, 20));
    }

    #[test]
    fn resize_of_flat_image_stays_flat() {
        let mut img = Rgba8Image::new(8, 8);
        for px in img.pixels.chunks_mut(4) {
            px.copy_from_slice(&[10, 20, 30, 255]);
        }
        let out = img.resize(3, 5);
        for px in out.pixels.chunks(4) {
            assert_eq!(px, &[10, 20, 30, 255]);
        }
    }
}
