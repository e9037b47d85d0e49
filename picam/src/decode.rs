//! Decoded frames.

use image::{GrayImage, RgbImage, RgbaImage};

use crate::{error::CaptureError, format::Format, frame::RawFrame, luma};

/// A frame decoded according to the session's [`Format`].
///
/// ```text
/// format    image
/// ------    ----------------------------------
/// Yuv420 -> Image::Yuv420(Yuv420Image)
/// Rgb    -> Image::Rgba(RgbaImage), alpha 255
/// Gray   -> Image::Gray(GrayImage)
/// ```
#[derive(Clone, Debug)]
pub enum Image {
    Yuv420(Yuv420Image),
    Rgba(RgbaImage),
    Gray(GrayImage),
}

impl Image {
    pub fn width(&self) -> u32 {
        self.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.dimensions().1
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Image::Yuv420(img) => (img.width(), img.height()),
            Image::Rgba(img) => img.dimensions(),
            Image::Gray(img) => img.dimensions(),
        }
    }

    pub fn format(&self) -> Format {
        match self {
            Image::Yuv420(_) => Format::Yuv420,
            Image::Rgba(_) => Format::Rgb,
            Image::Gray(_) => Format::Gray,
        }
    }

    /// Converts to packed 8-bit RGB.
    pub fn to_rgb(&self) -> RgbImage {
        match self {
            Image::Yuv420(img) => img.to_rgb(),
            Image::Rgba(img) => {
                let (w, h) = img.dimensions();
                RgbImage::from_fn(w, h, |x, y| {
                    let [r, g, b, _] = img.get_pixel(x, y).0;
                    image::Rgb([r, g, b])
                })
            }
            Image::Gray(img) => {
                let (w, h) = img.dimensions();
                RgbImage::from_fn(w, h, |x, y| {
                    let [l] = img.get_pixel(x, y).0;
                    image::Rgb([l, l, l])
                })
            }
        }
    }

    /// Single-channel intensity. YUV frames already carry it in their Y
    /// plane; RGBA frames go through [`luma::gray_from_rgba`].
    pub fn to_luma(&self) -> GrayImage {
        match self {
            Image::Yuv420(img) => img.to_luma(),
            Image::Rgba(img) => {
                let (w, h) = img.dimensions();
                let data = luma::gray_from_rgba(img.as_raw());
                GrayImage::from_raw(w, h, data).unwrap_or_else(|| GrayImage::new(w, h))
            }
            Image::Gray(img) => img.clone(),
        }
    }
}

/// Planar 4:2:0 frame in the padded layout written by `raspiyuv`.
///
/// `width`/`height` are the requested size. Rows are `y_stride` (luma) and
/// `c_stride` (chroma) bytes apart because the capture process pads the
/// width to a multiple of 32 and the height to a multiple of 16.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Yuv420Image {
    data: Vec<u8>,
    width: u32,
    height: u32,
    y_stride: usize,
    c_stride: usize,
    y_len: usize,
    c_len: usize,
}

impl Yuv420Image {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn y_stride(&self) -> usize {
        self.y_stride
    }

    pub fn c_stride(&self) -> usize {
        self.c_stride
    }

    pub fn y(&self) -> &[u8] {
        &self.data[..self.y_len]
    }

    pub fn cb(&self) -> &[u8] {
        &self.data[self.y_len..self.y_len + self.c_len]
    }

    pub fn cr(&self) -> &[u8] {
        &self.data[self.y_len + self.c_len..self.y_len + 2 * self.c_len]
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Luma sample at `(x, y)`. Panics outside the image, like
    /// `ImageBuffer::get_pixel`.
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        self.y()[y as usize * self.y_stride + x as usize]
    }

    /// `(cb, cr)` samples covering pixel `(x, y)`.
    pub fn chroma_at(&self, x: u32, y: u32) -> (u8, u8) {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        let i = (y as usize / 2) * self.c_stride + x as usize / 2;
        (self.cb()[i], self.cr()[i])
    }

    /// Full-range BT.601 conversion to RGB.
    pub fn to_rgb(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let l = self.luma_at(x, y) as f32;
            let (cb, cr) = self.chroma_at(x, y);
            let u = cb as f32 - 128.0;
            let v = cr as f32 - 128.0;

            let r = (l + 1.402 * v).clamp(0.0, 255.0) as u8;
            let g = (l - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
            let b = (l + 1.772 * u).clamp(0.0, 255.0) as u8;
            image::Rgb([r, g, b])
        })
    }

    /// Y plane cropped to the requested size.
    pub fn to_luma(&self) -> GrayImage {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for row in self.y().chunks_exact(self.y_stride).take(self.height as usize) {
            out.extend_from_slice(&row[..self.width as usize]);
        }
        GrayImage::from_raw(self.width, self.height, out)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }
}

/// Shapes one raw frame into the image type of `format`.
pub fn decode(
    format: Format,
    width: u32,
    height: u32,
    frame: RawFrame,
) -> Result<Image, CaptureError> {
    let invalid = || CaptureError::InvalidSize { width, height };
    let expected = format.raw_size(width, height).ok_or_else(invalid)?;
    if frame.is_partial() || frame.len() != expected {
        return Err(CaptureError::ShortFrame {
            expected,
            actual: frame.len(),
        });
    }

    let short = |actual| CaptureError::ShortFrame { expected, actual };
    let image = match format {
        Format::Yuv420 => {
            let (pw, _) = format.padded_size(width, height).ok_or_else(invalid)?;
            let (y_len, c_len) = format.plane_sizes(width, height).ok_or_else(invalid)?;
            Image::Yuv420(Yuv420Image {
                data: frame.into_inner(),
                width,
                height,
                y_stride: pw as usize,
                c_stride: pw as usize / 2,
                y_len,
                c_len,
            })
        }
        Format::Rgb => {
            let mut pixels = Vec::with_capacity(format.decoded_len(width, height).unwrap_or(0));
            for px in frame.data().chunks_exact(3) {
                pixels.extend_from_slice(px);
                pixels.push(u8::MAX);
            }
            let len = pixels.len();
            Image::Rgba(
                RgbaImage::from_raw(width, height, pixels).ok_or_else(|| short(len))?,
            )
        }
        Format::Gray => {
            let len = frame.len();
            Image::Gray(
                GrayImage::from_raw(width, height, frame.into_inner())
                    .ok_or_else(|| short(len))?,
            )
        }
    };
    Ok(image)
}
