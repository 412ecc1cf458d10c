//! Error types for RoverView

use crate::scanner::ScanError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// RoverView error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (stream reads, snapshot files, config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed or returned a non-success status
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration is well-formed but unusable
    #[error("Config error: {0}")]
    Config(String),

    /// Camera stream could not be segmented
    #[error("Stream error: {0}")]
    Scan(#[from] ScanError),

    /// Worker thread panicked
    #[error("Thread panic")]
    ThreadPanic,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}
