use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::process::ChildStdout;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ShortFramePolicy, frame::RawFrame, process::CaptureProcess, slot::FrameSlot,
};

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RelayExit {
    Cancelled,
    Eof,
    ReadError,
}

/// Cuts the capture stream into fixed-size frames and publishes each one
/// into the session's slot.
pub(crate) struct Relay {
    raw_size: usize,
    short_frame: ShortFramePolicy,
    slot: Arc<FrameSlot>,
}

/// Closes the slot when the relay task goes away, however it goes away.
struct CloseOnDrop(Arc<FrameSlot>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

impl Relay {
    pub fn new(raw_size: usize, short_frame: ShortFramePolicy, slot: Arc<FrameSlot>) -> Self {
        Self {
            raw_size,
            short_frame,
            slot,
        }
    }

    /// Runs the relay on its own task. When it stops, the capture stream is
    /// dropped, the process is killed and then the slot is closed.
    pub fn spawn(
        self,
        process: CaptureProcess,
        stdout: ChildStdout,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let _close = CloseOnDrop(self.slot.clone());
            let pid = process.pid();
            log::debug!("relay for pid {:?} started, frame size: {}", pid, self.raw_size);

            let exit = self.run(stdout, &cancel).await;
            log::info!("relay for pid {:?} stopped: {:?}", pid, exit);

            process.terminate().await;
        })
    }

    pub async fn run<R>(&self, reader: R, cancel: &CancellationToken) -> RelayExit
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut buf = vec![0u8; self.raw_size];

        loop {
            let filled = tokio::select! {
                _ = cancel.cancelled() => return RelayExit::Cancelled,
                result = read_frame(&mut reader, &mut buf) => result,
            };

            match filled {
                Ok(n) if n == self.raw_size => {
                    let frame = RawFrame::new(std::mem::take(&mut buf));
                    buf = match self.slot.publish(frame) {
                        Some(unclaimed) if unclaimed.len() == self.raw_size => {
                            unclaimed.into_inner()
                        }
                        _ => vec![0u8; self.raw_size],
                    };
                }
                Ok(0) => return RelayExit::Eof,
                Ok(n) => {
                    self.finish_short_frame(buf, n);
                    return RelayExit::Eof;
                }
                Err(e) => {
                    log::error!("read capture stream: {}", e);
                    return RelayExit::ReadError;
                }
            }
        }
    }

    fn finish_short_frame(&self, mut buf: Vec<u8>, filled: usize) {
        match self.short_frame {
            ShortFramePolicy::Discard => {
                log::warn!(
                    "capture stream ended mid-frame ({} of {} bytes), frame discarded",
                    filled,
                    self.raw_size
                );
            }
            ShortFramePolicy::Deliver => {
                log::warn!(
                    "capture stream ended mid-frame ({} of {} bytes), delivering partial frame",
                    filled,
                    self.raw_size
                );
                buf.truncate(filled);
                self.slot.publish(RawFrame::new_partial(buf));
            }
        }
    }
}

/// Reads until `buf` is full or the stream ends, returning the bytes read.
async fn read_frame<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
