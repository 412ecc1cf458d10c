//! ActuatorDriver trait definition

use crate::core::types::{Drivetrain, Headlight};
use crate::error::Result;

/// Actuator driver trait for hardware abstraction
///
/// Implementations own the physical outputs (motor driver lines, PWM
/// channels, indicator lights). Every call is a complete, synchronous
/// state transition: when it returns, the outputs reflect the request.
pub trait ActuatorDriver: Send {
    /// Claim hardware and apply the power-on state
    fn initialize(&mut self) -> Result<()>;

    /// Switch drivetrain direction (all direction lines + indicators)
    fn set_drivetrain(&mut self, drivetrain: Drivetrain) -> Result<()>;

    /// Set left motor duty cycle (0-100)
    fn set_left_speed(&mut self, speed: u8) -> Result<()>;

    /// Set right motor duty cycle (0-100)
    fn set_right_speed(&mut self, speed: u8) -> Result<()>;

    /// Switch the headlight
    fn set_headlight(&mut self, headlight: Headlight) -> Result<()>;

    /// Stop motors and release hardware
    fn shutdown(&mut self) -> Result<()>;
}
