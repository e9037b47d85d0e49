use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("invalid capture size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("unable to start {program}")]
    Start {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("capture stream ended")]
    StreamEnded,
    #[error("short frame: expected {expected} bytes, got {actual}")]
    ShortFrame { expected: usize, actual: usize },
    #[error("timed out waiting for a frame")]
    Timeout,
}
