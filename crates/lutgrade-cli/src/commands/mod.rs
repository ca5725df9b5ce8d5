//! CLI command implementations

pub mod apply;
pub mod convert;
pub mod info;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use lutgrade_core::{clut, cube, pack, PackedLut};
use lutgrade_render::Rgba8Image;

/// Load a PNG as RGBA8, expanding gray/RGB inputs.
pub fn load_png(path: &Path) -> Result<Rgba8Image> {
    let file = File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
    let decoder = png::Decoder::new(std::io::BufReader::new(file));
    let mut reader = decoder
        .read_info()
        .with_context(|| format!("Failed to read PNG: {}", path.display()))?;

    let buf_size = reader
        .output_buffer_size()
        .context("cannot determine PNG buffer size")?;
    let mut buf = vec![0u8; buf_size];
    let info = reader
        .next_frame(&mut buf)
        .with_context(|| format!("Failed to decode PNG: {}", path.display()))?;
    let bytes = &buf[..info.buffer_size()];

    let rgba: Vec<u8> = match (info.color_type, info.bit_depth) {
        (png::ColorType::Rgba, png::BitDepth::Eight) => bytes.to_vec(),
        (png::ColorType::Rgb, png::BitDepth::Eight) => bytes
            .chunks(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect(),
        (png::ColorType::Grayscale, png::BitDepth::Eight) => {
            bytes.iter().flat_map(|&g| [g, g, g, 255]).collect()
        }
        (png::ColorType::GrayscaleAlpha, png::BitDepth::Eight) => bytes
            .chunks(2)
            .flat_map(|ga| [ga[0], ga[0], ga[0], ga[1]])
            .collect(),
        (color_type, bit_depth) => {
            bail!("unsupported PNG pixel layout: {color_type:?} {bit_depth:?}")
        }
    };

    Rgba8Image::from_pixels(info.width, info.height, rgba)
        .with_context(|| format!("Invalid image data: {}", path.display()))
}

/// Save an RGBA8 image as PNG.
pub fn save_png(path: &Path, image: &Rgba8Image) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create: {}", path.display()))?;
    let writer = BufWriter::new(file);

    let mut encoder = png::Encoder::new(writer, image.width, image.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_source_srgb(png::SrgbRenderingIntent::Perceptual);

    let mut png_writer = encoder
        .write_header()
        .with_context(|| format!("Failed to write PNG header: {}", path.display()))?;
    png_writer
        .write_image_data(&image.pixels)
        .with_context(|| format!("Failed to write PNG: {}", path.display()))?;
    Ok(())
}

/// Load a LUT as a packed texture, by file extension.
pub fn load_lut(path: &Path) -> Result<PackedLut> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "cube" => {
            let lut = cube::read(path)
                .with_context(|| format!("Failed to parse: {}", path.display()))?;
            Ok(pack(&lut))
        }
        "clut" => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read: {}", path.display()))?;
            clut::decode(&bytes).with_context(|| format!("Failed to decode: {}", path.display()))
        }
        _ => bail!("Unsupported LUT format: .{}", ext),
    }
}

/// First 8 hex characters of the SHA-256 of `bytes`, used as the
/// manifest content hash.
pub fn short_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest[..4].iter().map(|b| format!("{b:02x}")).collect()
}
