use std::path::Path;

use anyhow::Context;
use jpeg_encoder::{ColorType, Encoder};
use picam::Image;

/// Encodes a decoded frame as JPEG. YUV frames are converted to RGB first.
pub fn encode(image: &Image, quality: u8) -> anyhow::Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    let width = u16::try_from(width).context("frame too wide for jpeg")?;
    let height = u16::try_from(height).context("frame too tall for jpeg")?;

    let mut out = Vec::new();
    let encoder = Encoder::new(&mut out, quality);
    match image {
        Image::Gray(gray) => encoder.encode(gray.as_raw(), width, height, ColorType::Luma)?,
        Image::Rgba(rgba) => encoder.encode(rgba.as_raw(), width, height, ColorType::Rgba)?,
        Image::Yuv420(_) => {
            let rgb = image.to_rgb();
            encoder.encode(rgb.as_raw(), width, height, ColorType::Rgb)?
        }
    }
    Ok(out)
}

pub fn save(image: &Image, path: &Path, quality: u8) -> anyhow::Result<()> {
    let data = encode(image, quality)?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))
}
