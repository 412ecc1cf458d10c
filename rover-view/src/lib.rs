//! RoverView - Operator-side camera viewer for the GrandRaspberry rover
//!
//! Pulls the rig's MJPEG-over-HTTP stream, cuts it into JPEG frames, and
//! hands the newest frame to the renderers.

pub mod config;
pub mod error;
pub mod render;
pub mod scanner;
pub mod slot;
pub mod source;
pub mod viewer;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use render::{FrameStats, Renderer, SnapshotRecorder};
pub use scanner::{FrameReader, JpegFrame, MjpegScanner, ScanError};
pub use slot::LatestFrame;
pub use source::{HttpSource, MemorySource, OpenStream, StreamCloser, StreamSource};
pub use viewer::{StreamStatus, StreamViewer, ViewerConfig};
