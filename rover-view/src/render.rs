//! Frame renderers
//!
//! Consumers of decoded-stream frames. Displaying images is left to the
//! embedding UI; the renderers here persist snapshots and track frame rate.

use crate::error::Result;
use crate::scanner::JpegFrame;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Receives every frame taken from the slot
pub trait Renderer {
    fn display_frame(&mut self, frame: &JpegFrame) -> Result<()>;
}

/// Saves every N-th frame as `<UTC timestamp>.jpg`
pub struct SnapshotRecorder {
    dir: PathBuf,
    every: u64,
    seen: u64,
    saved: u64,
    last: Option<PathBuf>,
}

impl SnapshotRecorder {
    /// Creates `dir` if missing. `every` of 0 is treated as 1.
    pub fn new(dir: impl Into<PathBuf>, every: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        log::info!("Saving every {} frame(s) to {}", every.max(1), dir.display());
        Ok(Self {
            dir,
            every: every.max(1),
            seen: 0,
            saved: 0,
            last: None,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn saved(&self) -> u64 {
        self.saved
    }

    pub fn last_saved(&self) -> Option<&Path> {
        self.last.as_deref()
    }

    fn file_name() -> String {
        format!("{}.jpg", Utc::now().format("%Y%m%d%H%M%S%6f"))
    }
}

impl Renderer for SnapshotRecorder {
    fn display_frame(&mut self, frame: &JpegFrame) -> Result<()> {
        self.seen += 1;
        if self.seen % self.every != 0 {
            return Ok(());
        }
        let path = self.dir.join(Self::file_name());
        fs::write(&path, frame.as_bytes())?;
        log::debug!("Snapshot {} ({} bytes)", path.display(), frame.len());
        self.saved += 1;
        self.last = Some(path);
        Ok(())
    }
}

/// Frame and byte counters with a periodic rate log
pub struct FrameStats {
    frames: u64,
    bytes: u64,
    interval: Duration,
    window_start: Instant,
    window_frames: u64,
    last_fps: f64,
}

impl FrameStats {
    pub fn new(interval: Duration) -> Self {
        Self {
            frames: 0,
            bytes: 0,
            interval,
            window_start: Instant::now(),
            window_frames: 0,
            last_fps: 0.0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Rate over the last completed window
    pub fn fps(&self) -> f64 {
        self.last_fps
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl Renderer for FrameStats {
    fn display_frame(&mut self, frame: &JpegFrame) -> Result<()> {
        self.frames += 1;
        self.bytes += frame.len() as u64;
        self.window_frames += 1;

        let elapsed = self.window_start.elapsed();
        if elapsed >= self.interval {
            self.last_fps = self.window_frames as f64 / elapsed.as_secs_f64();
            log::info!(
                "{:.1} fps, {} frames, {} KiB total",
                self.last_fps,
                self.frames,
                self.bytes / 1024
            );
            self.window_start = Instant::now();
            self.window_frames = 0;
        }
        Ok(())
    }
}
