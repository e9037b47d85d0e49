use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Pixel layout requested from `raspiyuv`.
///
/// The format decides three things: the flag passed to the capture process,
/// the size of one raw frame on its stdout and the shape of the decoded image.
///
/// ```text
/// format    flag      raw frame size                         decoded
/// ------    ------    -----------------------------------    ----------------
/// Yuv420    (none)    roundUp(w,32) * roundUp(h,16) * 3/2    Yuv420Image
/// Rgb       --rgb     w * h * 3                              RgbaImage
/// Gray      --luma    w * h                                  GrayImage
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Planar Y, Cb, Cr with 4:2:0 chroma subsampling.
    #[default]
    Yuv420,
    /// Packed 8-bit r, g, b.
    Rgb,
    /// Single 8-bit luma channel.
    Gray,
}

struct FormatLayout {
    name: &'static str,
    flag: Option<&'static str>,
    // (width multiple, height multiple) the capture process pads to
    align: (u32, u32),
    // raw bytes per padded pixel, as numerator / denominator
    ratio: (usize, usize),
}

const FORMATS: [FormatLayout; 3] = [
    FormatLayout {
        name: "YUV",
        flag: None,
        align: (32, 16),
        ratio: (3, 2),
    },
    FormatLayout {
        name: "RGB",
        flag: Some("--rgb"),
        align: (1, 1),
        ratio: (3, 1),
    },
    FormatLayout {
        name: "Gray",
        flag: Some("--luma"),
        align: (1, 1),
        ratio: (1, 1),
    },
];

impl Format {
    pub const ALL: [Format; 3] = [Format::Yuv420, Format::Rgb, Format::Gray];

    fn layout(self) -> &'static FormatLayout {
        &FORMATS[self as usize]
    }

    /// Short name: `YUV`, `RGB` or `Gray`.
    pub fn name(self) -> &'static str {
        self.layout().name
    }

    /// Extra `raspiyuv` flag selecting this layout, if any.
    pub fn flag(self) -> Option<&'static str> {
        self.layout().flag
    }

    /// Dimensions after the capture process pads them, `None` if padding
    /// overflows `u32`.
    pub fn padded_size(self, width: u32, height: u32) -> Option<(u32, u32)> {
        let (mw, mh) = self.layout().align;
        Some((round_up(width, mw)?, round_up(height, mh)?))
    }

    /// Length in bytes of one raw frame on the capture stream, `None` if it
    /// does not fit in `usize`.
    pub fn raw_size(self, width: u32, height: u32) -> Option<usize> {
        let (pw, ph) = self.padded_size(width, height)?;
        let (num, den) = self.layout().ratio;
        let pixels = (pw as usize).checked_mul(ph as usize)?;
        Some(pixels.checked_mul(num)? / den)
    }

    /// `(luma, chroma)` plane lengths of a `Yuv420` frame. Packed formats
    /// report their whole frame as a single plane.
    pub fn plane_sizes(self, width: u32, height: u32) -> Option<(usize, usize)> {
        match self {
            Format::Yuv420 => {
                let (pw, ph) = self.padded_size(width, height)?;
                let y = (pw as usize).checked_mul(ph as usize)?;
                Some((y, y / 4))
            }
            Format::Rgb | Format::Gray => Some((self.raw_size(width, height)?, 0)),
        }
    }

    /// Length in bytes of the decoded image's pixel storage.
    pub fn decoded_len(self, width: u32, height: u32) -> Option<usize> {
        let pixels = (width as usize).checked_mul(height as usize)?;
        match self {
            Format::Yuv420 => self.raw_size(width, height),
            Format::Rgb => pixels.checked_mul(4),
            Format::Gray => Some(pixels),
        }
    }
}

/// `ceil(value / multiple) * multiple`, `None` when `multiple` is zero or the
/// result overflows.
pub fn round_up(value: u32, multiple: u32) -> Option<u32> {
    value.checked_next_multiple_of(multiple)
}

impl Display for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown pixel format {0:?}, expected one of yuv, rgb, gray")]
pub struct ParseFormatError(String);

impl FromStr for Format {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yuv" | "yuv420" | "i420" => Ok(Format::Yuv420),
            "rgb" | "rgb24" => Ok(Format::Rgb),
            "gray" | "grey" | "luma" => Ok(Format::Gray),
            _ => Err(ParseFormatError(s.to_string())),
        }
    }
}
