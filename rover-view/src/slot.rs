//! Latest-frame handoff
//!
//! One-deep overwrite slot between the viewer thread (producer) and the
//! renderer (consumer). A new frame replaces one that was never taken, so
//! a slow consumer always sees the newest image and never builds a backlog.

use crate::scanner::JpegFrame;
use parking_lot::{Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct Inner {
    frame: Option<JpegFrame>,
    closed: bool,
    published: u64,
    dropped: u64,
}

/// Slot counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotStats {
    pub published: u64,
    /// Frames overwritten before being taken
    pub dropped: u64,
}

#[derive(Debug, Default)]
pub struct LatestFrame {
    inner: Mutex<Inner>,
    ready: Condvar,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `frame`, replacing any frame not yet taken
    pub fn publish(&self, frame: JpegFrame) {
        let mut inner = self.inner.lock();
        if inner.frame.replace(frame).is_some() {
            inner.dropped += 1;
        }
        inner.published += 1;
        drop(inner);
        self.ready.notify_one();
    }

    /// Take the current frame without blocking
    pub fn take(&self) -> Option<JpegFrame> {
        self.inner.lock().frame.take()
    }

    /// Block until a frame is available, the slot is closed, or `timeout`
    /// passes
    pub fn wait_timeout(&self, timeout: Duration) -> Option<JpegFrame> {
        let mut inner = self.inner.lock();
        if inner.frame.is_none() && !inner.closed {
            let _ = self.ready.wait_for(&mut inner, timeout);
        }
        inner.frame.take()
    }

    /// Wake every waiter; later waits return immediately
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn stats(&self) -> SlotStats {
        let inner = self.inner.lock();
        SlotStats {
            published: inner.published,
            dropped: inner.dropped,
        }
    }
}
