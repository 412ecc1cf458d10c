//! Error types for RoverIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// RoverIO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error (sockets, config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration is well-formed but unusable
    #[error("Config error: {0}")]
    Config(String),

    /// Unknown device type in config
    #[error("Unknown device type: {0}")]
    UnknownDevice(String),

    /// GPIO backend failure (pin claim, PWM setup)
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// Invalid parameter supplied by a caller
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Worker thread panicked
    #[error("Thread panic")]
    ThreadPanic,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

#[cfg(all(feature = "gpio", target_os = "linux"))]
impl From<rppal::gpio::Error> for Error {
    fn from(e: rppal::gpio::Error) -> Self {
        Error::Gpio(e.to_string())
    }
}
