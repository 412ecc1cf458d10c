//! Configuration for RoverView
//!
//! ```toml
//! [stream]
//! url = "http://192.168.1.1:8080/?action=stream"
//! connect_timeout_ms = 3000
//! reconnect_ms = 2000
//!
//! [scanner]
//! max_buffer_bytes = 4194304
//! chunk_size = 1024
//!
//! [snapshot]
//! dir = "photos"
//! every = 30
//!
//! [logging]
//! level = "info"
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Camera stream endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    /// MJPEG-over-HTTP URL (mjpg-streamer on the rig)
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Delay before reopening a failed stream; 0 disables reconnecting
    #[serde(default = "default_reconnect")]
    pub reconnect_ms: u64,
}

fn default_url() -> String {
    "http://192.168.1.1:8080/?action=stream".to_string()
}

fn default_connect_timeout() -> u64 {
    3000
}

fn default_reconnect() -> u64 {
    2000
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            connect_timeout_ms: default_connect_timeout(),
            reconnect_ms: default_reconnect(),
        }
    }
}

/// Frame scanner limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    /// Retained bytes allowed without a complete frame
    #[serde(default = "default_max_buffer")]
    pub max_buffer_bytes: usize,
    /// Bytes requested per read
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_max_buffer() -> usize {
    crate::scanner::DEFAULT_MAX_BUFFER
}

fn default_chunk_size() -> usize {
    crate::scanner::DEFAULT_CHUNK_SIZE
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_buffer_bytes: default_max_buffer(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Snapshot recording
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SnapshotConfig {
    /// Output directory; recording is off when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Save every N-th displayed frame (0 = off)
    #[serde(default)]
    pub every: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scanner.chunk_size == 0 {
            return Err(Error::Config("scanner.chunk_size must be > 0".to_string()));
        }
        if self.scanner.max_buffer_bytes < self.scanner.chunk_size {
            return Err(Error::Config(
                "scanner.max_buffer_bytes must be at least chunk_size".to_string(),
            ));
        }
        if !self.stream.url.starts_with("http://") && !self.stream.url.starts_with("https://") {
            return Err(Error::Config(format!(
                "stream.url must be http(s): {}",
                self.stream.url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scanner.max_buffer_bytes, 4 * 1024 * 1024);
        assert_eq!(config.scanner.chunk_size, 1024);
        assert!(config.snapshot.dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file() {
        let config = Config::from_toml(
            r#"
[stream]
url = "http://10.0.0.2:8080/?action=stream"

[snapshot]
dir = "/tmp/shots"
every = 10
"#,
        )
        .unwrap();
        assert_eq!(config.stream.url, "http://10.0.0.2:8080/?action=stream");
        assert_eq!(config.stream.reconnect_ms, 2000);
        assert_eq!(config.snapshot.dir, Some(PathBuf::from("/tmp/shots")));
        assert_eq!(config.snapshot.every, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_rejects_zero_chunk() {
        let result = Config::from_toml("[scanner]\nchunk_size = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let result = Config::from_toml("[stream]\nurl = \"rtsp://cam/stream\"\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.toml");
        fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_sample_config_parses() {
        let config = Config::from_toml(include_str!("../rover-view.toml")).unwrap();
        assert_eq!(config.logging.level, "info");
    }
}
