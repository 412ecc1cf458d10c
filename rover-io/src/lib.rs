//! RoverIO - Actuator daemon library for the GrandRaspberry rover
//!
//! Receives 0xFF-framed 3-byte commands over TCP and drives the motor
//! driver and lights through an [`ActuatorDriver`].
//!
//! ## Features
//!
//! - `gpio`: Raspberry Pi GPIO backend (Linux only)

pub mod client;
pub mod config;
pub mod core;
pub mod devices;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use core::driver::ActuatorDriver;
pub use core::types::{ActuatorState, Drivetrain, Headlight};
pub use dispatch::{ActuatorController, Outcome, SharedController};
pub use error::{Error, Result};
pub use protocol::{Command, Frame, Framer};
pub use server::CommandServer;
