//! Core abstractions for actuator drivers.
//!
//! - [`driver::ActuatorDriver`]: Trait to implement for new hardware
//! - [`types`]: Drivetrain, light, and actuator state types

pub mod driver;
pub mod types;
