//! Core data types for actuator state.
//!
//! Key types for device implementers:
//! - [`Drivetrain`]: Direction the wheels are driven in
//! - [`DriveLines`]: Output pattern for each drivetrain state (L298 + indicators)
//! - [`ActuatorState`]: Last state applied to the hardware

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum PWM duty cycle accepted by the motor channels
pub const MAX_SPEED: u8 = 100;

/// Drivetrain direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Drivetrain {
    #[default]
    Stopped,
    Forward,
    Backward,
    TurningLeft,
    TurningRight,
}

impl Drivetrain {
    /// Output line pattern for this direction
    pub const fn lines(self) -> DriveLines {
        match self {
            Drivetrain::Forward => DriveLines::new(true, [true, false, true, false], [false, false]),
            Drivetrain::Backward => {
                DriveLines::new(true, [false, true, false, true], [true, false])
            }
            Drivetrain::TurningLeft => {
                DriveLines::new(true, [true, false, false, true], [false, true])
            }
            Drivetrain::TurningRight => {
                DriveLines::new(true, [false, true, true, false], [false, true])
            }
            Drivetrain::Stopped => {
                DriveLines::new(false, [false, false, false, false], [true, true])
            }
        }
    }
}

impl fmt::Display for Drivetrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Drivetrain::Stopped => "stop",
            Drivetrain::Forward => "forward",
            Drivetrain::Backward => "backward",
            Drivetrain::TurningLeft => "turn left",
            Drivetrain::TurningRight => "turn right",
        };
        f.write_str(name)
    }
}

/// Headlight state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Headlight {
    #[default]
    On,
    Off,
}

impl Headlight {
    pub fn is_on(self) -> bool {
        self == Headlight::On
    }
}

impl From<bool> for Headlight {
    fn from(on: bool) -> Self {
        if on { Headlight::On } else { Headlight::Off }
    }
}

/// Logical output levels for one drivetrain state
///
/// `true` = line driven high. The enable level applies to both ENA and ENB.
/// `direction` is IN1..IN4 (M1+, M1-, M2+, M2-). `indicators` is LED1, LED2;
/// the indicator LEDs are wired active-low, so `true` means dark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveLines {
    pub enable: bool,
    pub direction: [bool; 4],
    pub indicators: [bool; 2],
}

impl DriveLines {
    const fn new(enable: bool, direction: [bool; 4], indicators: [bool; 2]) -> Self {
        Self {
            enable,
            direction,
            indicators,
        }
    }
}

/// Process-wide actuator state
///
/// Reflects the last transition the driver accepted. Volatile: every process
/// start begins from [`ActuatorState::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorState {
    pub drivetrain: Drivetrain,
    pub left_speed: u8,
    pub right_speed: u8,
    pub headlight: Headlight,
}

impl Default for ActuatorState {
    /// Stopped, lights on, both PWM channels at full duty (the rig starts
    /// its PWM outputs at 100%)
    fn default() -> Self {
        Self {
            drivetrain: Drivetrain::Stopped,
            left_speed: MAX_SPEED,
            right_speed: MAX_SPEED,
            headlight: Headlight::On,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = ActuatorState::default();
        assert_eq!(state.drivetrain, Drivetrain::Stopped);
        assert_eq!(state.headlight, Headlight::On);
        assert_eq!(state.left_speed, 100);
        assert_eq!(state.right_speed, 100);
    }

    #[test]
    fn test_stopped_disables_both_channels() {
        let lines = Drivetrain::Stopped.lines();
        assert!(!lines.enable);
        assert_eq!(lines.direction, [false; 4]);
        assert_eq!(lines.indicators, [true, true]);
    }

    #[test]
    fn test_moving_states_enable_channels() {
        for dt in [
            Drivetrain::Forward,
            Drivetrain::Backward,
            Drivetrain::TurningLeft,
            Drivetrain::TurningRight,
        ] {
            let lines = dt.lines();
            assert!(lines.enable, "{dt} should enable motors");
            // Each motor gets exactly one of its two inputs high
            assert_ne!(lines.direction[0], lines.direction[1]);
            assert_ne!(lines.direction[2], lines.direction[3]);
        }
    }

    #[test]
    fn test_turns_drive_motors_in_opposite_directions() {
        let left = Drivetrain::TurningLeft.lines().direction;
        let right = Drivetrain::TurningRight.lines().direction;
        assert_eq!(left, [true, false, false, true]);
        assert_eq!(right, [false, true, true, false]);
    }

    #[test]
    fn test_headlight_from_bool() {
        assert_eq!(Headlight::from(true), Headlight::On);
        assert_eq!(Headlight::from(false), Headlight::Off);
        assert!(Headlight::On.is_on());
    }
}
