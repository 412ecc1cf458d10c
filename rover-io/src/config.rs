//! Configuration for RoverIO
//!
//! Loads configuration from a TOML file. Every field has a default, so a
//! partial file (or no file at all) yields a working mock setup.
//!
//! ```toml
//! [network]
//! bind_address = "0.0.0.0:8081"
//!
//! [device]
//! type = "gpio"
//!
//! [device.pins]
//! ena = 13
//! enb = 20
//!
//! [session]
//! stop_on_disconnect = true
//!
//! [logging]
//! level = "info"
//! ```

use crate::error::{Error, Result};
use crate::protocol::constants::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Command socket configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// TCP bind address for the command protocol
    ///
    /// Examples:
    /// - `0.0.0.0:8081` - All interfaces (rig default)
    /// - `127.0.0.1:0` - Localhost, ephemeral port (tests)
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_bind_address() -> String {
    format!("0.0.0.0:{}", DEFAULT_PORT)
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl NetworkConfig {
    /// Parse the bind address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address.parse().map_err(|e| {
            Error::Config(format!(
                "invalid bind_address '{}': {}",
                self.bind_address, e
            ))
        })
    }
}

/// Actuator device configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Device type: "mock" or "gpio"
    #[serde(rename = "type", default = "default_device_type")]
    pub device_type: String,
    /// Blink the indicator LEDs at startup (GPIO only)
    #[serde(default = "default_true")]
    pub startup_blink: bool,
    /// PWM carrier frequency for the motor enable lines
    #[serde(default = "default_pwm_frequency")]
    pub pwm_frequency_hz: f64,
    /// BCM pin numbers
    #[serde(default)]
    pub pins: PinConfig,
}

fn default_device_type() -> String {
    "mock".to_string()
}

fn default_true() -> bool {
    true
}

fn default_pwm_frequency() -> f64 {
    1000.0
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: default_device_type(),
            startup_blink: true,
            pwm_frequency_hz: default_pwm_frequency(),
            pins: PinConfig::default(),
        }
    }
}

/// BCM pin assignment for the L298 motor driver and LEDs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PinConfig {
    /// L298 ENABLE A (left motors, PWM)
    pub ena: u8,
    /// L298 ENABLE B (right motors, PWM)
    pub enb: u8,
    /// M1+
    pub in1: u8,
    /// M1-
    pub in2: u8,
    /// M2+
    pub in3: u8,
    /// M2-
    pub in4: u8,
    /// Headlight
    pub led0: u8,
    /// Indicator 1
    pub led1: u8,
    /// Indicator 2
    pub led2: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            ena: 13,
            enb: 20,
            in1: 19,
            in2: 16,
            in3: 21,
            in4: 26,
            led0: 10,
            led1: 9,
            led2: 25,
        }
    }
}

impl PinConfig {
    /// All pins in a fixed order, used to detect double assignment
    fn all(&self) -> [u8; 9] {
        [
            self.ena, self.enb, self.in1, self.in2, self.in3, self.in4, self.led0, self.led1,
            self.led2,
        ]
    }
}

/// Per-connection behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Command the drivetrain to stop when the controlling client disconnects
    #[serde(default = "default_true")]
    pub stop_on_disconnect: bool,
    /// Receive buffer size per read call
    #[serde(default = "default_read_chunk")]
    pub read_chunk: usize,
}

fn default_read_chunk() -> usize {
    64
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stop_on_disconnect: true,
            read_chunk: default_read_chunk(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

    /// Reject values that would only fail later at runtime
    pub fn validate(&self) -> Result<()> {
        self.network.socket_addr()?;

        if self.session.read_chunk == 0 {
            return Err(Error::Config("session.read_chunk must be > 0".to_string()));
        }
        if !(self.device.pwm_frequency_hz > 0.0) {
            return Err(Error::Config(
                "device.pwm_frequency_hz must be > 0".to_string(),
            ));
        }

        let pins = self.device.pins.all();
        for (i, pin) in pins.iter().enumerate() {
            if pins[i + 1..].contains(pin) {
                return Err(Error::Config(format!("BCM pin {} assigned twice", pin)));
            }
        }
        Ok(())
    }
}
