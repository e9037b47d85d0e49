//! Single-slot handoff between the relay task and frame readers.
//!
//! Publishing never waits: a new frame replaces whatever is still unclaimed
//! in the slot and the replaced frame is handed back to the producer so its
//! allocation can be reused. Readers take the frame out of the slot, or wait
//! until one is published or the slot is closed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::{error::CaptureError, frame::RawFrame};

/// Counters kept by the relay for one session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Frames read from the capture stream.
    pub frames_read: u64,
    /// Frames replaced in the slot before any reader claimed them.
    pub frames_dropped: u64,
}

#[derive(Default)]
struct SlotState {
    frame: Option<RawFrame>,
    closed: bool,
}

#[derive(Default)]
pub(crate) struct FrameSlot {
    state: Mutex<SlotState>,
    notify: Notify,
    frames_read: AtomicU64,
    frames_dropped: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `frame` as the latest one and returns the frame it replaced, if
    /// nobody had taken it yet. A closed slot refuses the frame and returns it.
    pub fn publish(&self, frame: RawFrame) -> Option<RawFrame> {
        let displaced = {
            let mut state = self.lock();
            if state.closed {
                return Some(frame);
            }
            state.frame.replace(frame)
        };

        self.frames_read.fetch_add(1, Ordering::Relaxed);
        if displaced.is_some() {
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.notify.notify_waiters();
        displaced
    }

    /// Marks the end of the stream and wakes every waiting reader. A frame
    /// still in the slot stays readable once.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn poll_take(&self) -> Option<Result<RawFrame, CaptureError>> {
        let mut state = self.lock();
        match state.frame.take() {
            Some(frame) => Some(Ok(frame)),
            None if state.closed => Some(Err(CaptureError::StreamEnded)),
            None => None,
        }
    }

    /// Takes the latest frame without waiting.
    pub fn try_take(&self) -> Result<Option<RawFrame>, CaptureError> {
        self.poll_take().transpose()
    }

    /// Takes the latest frame, waiting for the relay to publish one.
    pub async fn take(&self) -> Result<RawFrame, CaptureError> {
        loop {
            // register before looking at the slot so a publish in between is not missed
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(result) = self.poll_take() {
                return result;
            }
            notified.await;
        }
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            frames_read: self.frames_read.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
        }
    }
}
