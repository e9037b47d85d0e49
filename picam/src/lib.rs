//! Latest-frame capture from the Raspberry Pi camera through `raspiyuv`.
//!
//! [`Camera::start`] launches
//!
//! ```text
//! raspiyuv --width W --height H --timeout 0 --timelapse 0 --burst --nopreview [--rgb|--luma] --output -
//! ```
//!
//! and keeps cutting its stdout into frames on a background task. Reads
//! return the most recent frame, either raw ([`Camera::read_raw`]) or decoded
//! ([`Camera::read_image`]) according to the [`Format`]:
//!
//! * [`Format::Yuv420`]: planar 4:2:0, [`Yuv420Image`]
//! * [`Format::Rgb`]: packed RGB, decoded as [`RgbaImage`]
//! * [`Format::Gray`]: luma only, [`GrayImage`]

mod camera;
mod config;
mod decode;
mod error;
mod format;
mod frame;
pub mod luma;
mod process;
mod relay;
mod slot;

pub use ::image::{GrayImage, RgbImage, RgbaImage};

pub use camera::{Camera, FrameReader};
pub use config::{CameraConfig, DEFAULT_PROGRAM, ShortFramePolicy};
pub use decode::{Image, Yuv420Image, decode};
pub use error::CaptureError;
pub use format::{Format, ParseFormatError, round_up};
pub use frame::RawFrame;
pub use slot::RelayStats;
