use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    config::CameraConfig,
    decode::{Image, decode},
    error::CaptureError,
    format::Format,
    frame::RawFrame,
    process::CaptureProcess,
    relay::Relay,
    slot::{FrameSlot, RelayStats},
};

/// A running `raspiyuv` capture.
///
/// A background relay task keeps reading frames from the process and only
/// the most recent unclaimed frame is kept. Readers that are slower than the
/// camera miss the frames in between.
///
/// ```no_run
/// # async fn run() -> Result<(), picam::CaptureError> {
/// let cam = picam::Camera::start(640, 480, picam::Format::Yuv420)?;
/// let img = cam.read_image().await?;
/// assert_eq!(img.dimensions(), (640, 480));
/// let raw = cam.read_raw().await?;
/// assert_eq!(raw.len(), 460_800);
/// cam.close().await;
/// # Ok(())
/// # }
/// ```
pub struct Camera {
    reader: FrameReader,
    pid: Option<u32>,
    cancel: CancellationToken,
    relay: Option<JoinHandle<()>>,
}

impl Camera {
    /// Starts `raspiyuv` with the given size and format. Must be called from
    /// within a tokio runtime.
    pub fn start(width: u32, height: u32, format: Format) -> Result<Self, CaptureError> {
        Self::with_config(CameraConfig::new(width, height, format))
    }

    /// Fails with [`CaptureError::InvalidSize`] for a zero dimension or one
    /// whose raw frame size does not fit in memory.
    pub fn with_config(config: CameraConfig) -> Result<Self, CaptureError> {
        let invalid = CaptureError::InvalidSize {
            width: config.width,
            height: config.height,
        };
        if config.width == 0 || config.height == 0 {
            return Err(invalid);
        }
        let raw_size = config.raw_size().ok_or(invalid)?;

        let (process, stdout) = CaptureProcess::spawn(&config)?;
        let pid = process.pid();

        let slot = Arc::new(FrameSlot::new());
        let cancel = CancellationToken::new();
        let relay = Relay::new(raw_size, config.short_frame, slot.clone()).spawn(
            process,
            stdout,
            cancel.clone(),
        );

        Ok(Self {
            reader: FrameReader {
                width: config.width,
                height: config.height,
                format: config.format,
                raw_size,
                slot,
            },
            pid,
            cancel,
            relay: Some(relay),
        })
    }

    pub fn width(&self) -> u32 {
        self.reader.width
    }

    pub fn height(&self) -> u32 {
        self.reader.height
    }

    pub fn format(&self) -> Format {
        self.reader.format
    }

    pub fn raw_size(&self) -> usize {
        self.reader.raw_size()
    }

    /// Pid of the capture process, if it was still known at spawn.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// False once the capture stream has ended.
    pub fn is_running(&self) -> bool {
        !self.reader.slot.is_closed()
    }

    pub fn stats(&self) -> RelayStats {
        self.reader.slot.stats()
    }

    /// A handle for reading frames from other tasks or threads. It keeps
    /// working until the session ends, then returns
    /// [`CaptureError::StreamEnded`].
    pub fn reader(&self) -> FrameReader {
        self.reader.clone()
    }

    pub async fn read_raw(&self) -> Result<RawFrame, CaptureError> {
        self.reader.read_raw().await
    }

    pub async fn read_image(&self) -> Result<Image, CaptureError> {
        self.reader.read_image().await
    }

    pub async fn read_raw_timeout(&self, timeout: Duration) -> Result<RawFrame, CaptureError> {
        self.reader.read_raw_timeout(timeout).await
    }

    pub async fn read_image_timeout(&self, timeout: Duration) -> Result<Image, CaptureError> {
        self.reader.read_image_timeout(timeout).await
    }

    pub fn try_read_raw(&self) -> Result<Option<RawFrame>, CaptureError> {
        self.reader.try_read_raw()
    }

    /// Stops the relay and kills the capture process. Returns once both are
    /// gone; pending reads on [`FrameReader`]s fail with
    /// [`CaptureError::StreamEnded`].
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(relay) = self.relay.take() {
            if let Err(e) = relay.await {
                log::error!("relay task for pid {:?} failed: {}", self.pid, e);
            }
        }
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        // the relay still kills the process, nobody waits for it
        self.cancel.cancel();
    }
}

/// Read side of a [`Camera`].
///
/// Every read claims the latest frame: two readers never get the same frame.
#[derive(Clone)]
pub struct FrameReader {
    width: u32,
    height: u32,
    format: Format,
    raw_size: usize,
    slot: Arc<FrameSlot>,
}

impl FrameReader {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn raw_size(&self) -> usize {
        self.raw_size
    }

    /// Waits for the next frame.
    ///
    /// The length of the returned frame depends on the format:
    ///
    /// ```text
    /// format    len
    /// ------    ---------------------------------------
    /// Yuv420    roundUp(width,32) * roundUp(height,16) * 3/2
    /// Rgb       width * height * 3
    /// Gray      width * height
    /// ```
    ///
    /// A frame marked [`RawFrame::is_partial`] can only show up with
    /// [`ShortFramePolicy::Deliver`](crate::ShortFramePolicy::Deliver).
    pub async fn read_raw(&self) -> Result<RawFrame, CaptureError> {
        self.slot.take().await
    }

    /// Waits for the next frame and decodes it.
    pub async fn read_image(&self) -> Result<Image, CaptureError> {
        let frame = self.read_raw().await?;
        decode(self.format, self.width, self.height, frame)
    }

    /// Like [`read_raw`](Self::read_raw) but gives up after `timeout`. A
    /// frame arriving later stays available to the next read.
    pub async fn read_raw_timeout(&self, timeout: Duration) -> Result<RawFrame, CaptureError> {
        tokio::time::timeout(timeout, self.read_raw())
            .await
            .map_err(|_| CaptureError::Timeout)?
    }

    pub async fn read_image_timeout(&self, timeout: Duration) -> Result<Image, CaptureError> {
        let frame = self.read_raw_timeout(timeout).await?;
        decode(self.format, self.width, self.height, frame)
    }

    /// Takes the latest frame if one is waiting.
    pub fn try_read_raw(&self) -> Result<Option<RawFrame>, CaptureError> {
        self.slot.try_take()
    }

    /// Blocking [`read_raw`](Self::read_raw) for code outside the runtime.
    /// Do not call it from an async task.
    pub fn blocking_read_raw(&self) -> Result<RawFrame, CaptureError> {
        futures::executor::block_on(self.read_raw())
    }

    pub fn blocking_read_image(&self) -> Result<Image, CaptureError> {
        futures::executor::block_on(self.read_image())
    }

    /// Raw frames until the capture ends.
    pub fn frames(self) -> impl Stream<Item = RawFrame> + Send + 'static {
        futures::stream::unfold(self, |reader| async move {
            reader.read_raw().await.ok().map(|frame| (frame, reader))
        })
    }
}

#[cfg(all(test, unix))]
#[path = "camera_test.rs"]
mod camera_test;
