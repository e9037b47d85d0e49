use serde::{Deserialize, Serialize};

use crate::format::Format;

pub const DEFAULT_PROGRAM: &str = "raspiyuv";

/// What to do with the bytes of a frame cut short by the end of the stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortFramePolicy {
    /// Drop the partial frame; readers see the stream end.
    #[default]
    Discard,
    /// Hand the partial bytes to the next reader, marked with
    /// [`RawFrame::is_partial`](crate::RawFrame::is_partial).
    Deliver,
}

/// Capture session settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    pub format: Format,
    /// Capture binary, looked up in `PATH` when not absolute.
    pub program: String,
    /// Arguments placed before the capture flags.
    pub program_args: Vec<String>,
    /// Arguments placed after the capture flags, before `--output -`.
    pub extra_args: Vec<String>,
    pub short_frame: ShortFramePolicy,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            format: Format::default(),
            program: DEFAULT_PROGRAM.to_string(),
            program_args: Vec::new(),
            extra_args: Vec::new(),
            short_frame: ShortFramePolicy::default(),
        }
    }
}

impl CameraConfig {
    pub fn new(width: u32, height: u32, format: Format) -> Self {
        Self {
            width,
            height,
            format,
            ..Default::default()
        }
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program_arg(mut self, arg: impl Into<String>) -> Self {
        self.program_args.push(arg.into());
        self
    }

    pub fn extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    pub fn short_frame(mut self, policy: ShortFramePolicy) -> Self {
        self.short_frame = policy;
        self
    }

    pub fn raw_size(&self) -> Option<usize> {
        self.format.raw_size(self.width, self.height)
    }

    /// Full argument list passed to [`program`](Self::program).
    pub fn args(&self) -> Vec<String> {
        let mut args = self.program_args.clone();
        args.extend([
            "--width".to_string(),
            self.width.to_string(),
            "--height".to_string(),
            self.height.to_string(),
            "--timeout".to_string(),
            "0".to_string(),
            "--timelapse".to_string(),
            "0".to_string(),
            "--burst".to_string(),
            "--nopreview".to_string(),
        ]);
        if let Some(flag) = self.format.flag() {
            args.push(flag.to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args.push("--output".to_string());
        args.push("-".to_string());
        args
    }
}
