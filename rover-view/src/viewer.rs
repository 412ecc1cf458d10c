//! Stream viewer thread
//!
//! Opens the camera stream on a background thread, scans it into frames,
//! and hands every frame to a [`LatestFrame`] slot. Status changes go to the
//! UI over a channel.
//!
//! ```text
//!  ┌─────────────┐ bytes ┌──────────────┐ frames ┌─────────────┐
//!  │ StreamSource│──────▶│ FrameReader  │───────▶│ LatestFrame │──▶ renderer
//!  └─────────────┘       └──────────────┘        └─────────────┘
//!         │                     │
//!         └──── StreamStatus ───┴──────────────▶ status channel
//! ```
//!
//! The stop flag is checked once per chunk. A read parked on a silent
//! camera is released by the stream's closer, which [`StreamViewer::stop`]
//! calls before joining. Every failure ends the read loop with
//! [`StreamStatus::Offline`]; none of them reach the caller as a panic.

use crate::config::{ScannerConfig, StreamConfig};
use crate::error::{Error, Result};
use crate::scanner::FrameReader;
use crate::slot::LatestFrame;
use crate::source::{OpenStream, StreamCloser, StreamSource};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Operator-visible stream status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Connecting,
    Online,
    /// Stream lost; carries the reason
    Offline(String),
    /// Viewer stopped on request
    Stopped,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamStatus::Connecting => f.write_str("Connecting..."),
            StreamStatus::Online => f.write_str("Online"),
            StreamStatus::Offline(reason) => write!(f, "Offline: {}", reason),
            StreamStatus::Stopped => f.write_str("Stopped"),
        }
    }
}

/// Viewer thread settings
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub chunk_size: usize,
    pub max_buffer_bytes: usize,
    /// Delay before reopening after Offline; `None` ends the thread instead
    pub reconnect: Option<Duration>,
}

impl ViewerConfig {
    pub fn from_config(stream: &StreamConfig, scanner: &ScannerConfig) -> Self {
        Self {
            chunk_size: scanner.chunk_size,
            max_buffer_bytes: scanner.max_buffer_bytes,
            reconnect: (stream.reconnect_ms > 0).then(|| Duration::from_millis(stream.reconnect_ms)),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::scanner::DEFAULT_CHUNK_SIZE,
            max_buffer_bytes: crate::scanner::DEFAULT_MAX_BUFFER,
            reconnect: None,
        }
    }
}

/// Background viewer thread handle
pub struct StreamViewer {
    running: Arc<AtomicBool>,
    closer: Arc<Mutex<Option<StreamCloser>>>,
    handle: Option<JoinHandle<()>>,
}

struct Worker {
    source: Box<dyn StreamSource>,
    config: ViewerConfig,
    slot: Arc<LatestFrame>,
    status_tx: Sender<StreamStatus>,
    running: Arc<AtomicBool>,
    /// Closer of the stream being read, if any
    closer: Arc<Mutex<Option<StreamCloser>>>,
}

impl StreamViewer {
    /// Start the viewer thread
    pub fn spawn(
        source: Box<dyn StreamSource>,
        config: ViewerConfig,
        slot: Arc<LatestFrame>,
        status_tx: Sender<StreamStatus>,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let closer = Arc::new(Mutex::new(None));
        let worker = Worker {
            source,
            config,
            slot,
            status_tx,
            running: Arc::clone(&running),
            closer: Arc::clone(&closer),
        };
        let handle = thread::Builder::new()
            .name("stream-viewer".to_string())
            .spawn(move || worker.run())
            .map_err(|e| Error::Other(format!("Failed to spawn viewer thread: {}", e)))?;

        Ok(Self {
            running,
            closer,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Request stop, close the open stream, and wait for the thread
    pub fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::Relaxed);
        // Taken under the lock the worker registers with, so a stream
        // opened after this point sees the cleared flag instead
        let closer = self.closer.lock().take();
        if let Some(close) = closer {
            close();
        }
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| Error::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for StreamViewer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("Viewer thread: {}", e);
        }
    }
}

impl Worker {
    fn run(self) {
        let name = self.source.describe();
        loop {
            let result = self.stream_once();
            if !self.is_running() {
                break;
            }
            let reason = match result {
                Ok(()) => "stream ended".to_string(),
                Err(e) => e.to_string(),
            };
            log::warn!("{}: offline: {}", name, reason);
            self.send(StreamStatus::Offline(reason));

            if !self.wait_reconnect() {
                break;
            }
        }

        if !self.is_running() {
            log::info!("{}: viewer stopped", name);
            self.send(StreamStatus::Stopped);
        }
        self.slot.close();
    }

    /// One connection: open, read until end, failure, or stop
    fn stream_once(&self) -> Result<()> {
        self.send(StreamStatus::Connecting);
        let OpenStream { reader, closer } = self.source.open()?;
        *self.closer.lock() = closer;
        let result = self.read_frames(reader);
        // Dropped unused once the stream is done
        self.closer.lock().take();
        result
    }

    fn read_frames(&self, stream: Box<dyn std::io::Read + Send>) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        log::info!("{}: online", self.source.describe());
        self.send(StreamStatus::Online);

        let mut reader =
            FrameReader::with_limits(stream, self.config.chunk_size, self.config.max_buffer_bytes);
        let mut frames = Vec::new();
        while self.is_running() {
            let result = reader.read_chunk(&mut frames);
            // Frames completed by a failing chunk are still good
            for frame in frames.drain(..) {
                self.slot.publish(frame);
            }
            if !result? {
                break;
            }
        }

        let stats = reader.stats();
        log::debug!(
            "Stream closed: {} bytes read, {} frames, {} bytes discarded",
            reader.bytes_read(),
            stats.frames,
            stats.discarded_bytes
        );
        Ok(())
    }

    /// Sleep before reconnecting in short steps; false when not reconnecting
    fn wait_reconnect(&self) -> bool {
        let Some(delay) = self.config.reconnect else {
            return false;
        };
        let step = Duration::from_millis(50);
        let mut waited = Duration::ZERO;
        while waited < delay {
            if !self.is_running() {
                return false;
            }
            thread::sleep(step.min(delay - waited));
            waited += step;
        }
        self.is_running()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn send(&self, status: StreamStatus) {
        // Receiver gone means nobody displays status; frames still flow
        let _ = self.status_tx.send(status);
    }
}
