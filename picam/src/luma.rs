//! Luma from packed color, using fixed perceptual weights.

const R: f64 = 0.21;
const G: f64 = 0.72;
const B: f64 = 0.07;

fn weigh(r: u8, g: u8, b: u8) -> u8 {
    (R * r as f64 + G * g as f64 + B * b as f64) as u8
}

/// Converts packed `r, g, b` bytes into one luma byte per pixel.
///
/// The result is truncated, not rounded. Trailing bytes that do not make up a
/// whole pixel are ignored, so the output holds `rgb.len() / 3` bytes.
pub fn gray(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3).map(|p| weigh(p[0], p[1], p[2])).collect()
}

/// Same as [`gray`] for packed `r, g, b, a` pixels. Alpha is ignored.
pub fn gray_from_rgba(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4).map(|p| weigh(p[0], p[1], p[2])).collect()
}
