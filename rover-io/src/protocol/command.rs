//! Command table
//!
//! | Opcode | Subcode | Command | Argument |
//! |--------|---------|---------|----------|
//! | 0x00 | 0x00 | stop | ignored |
//! | 0x00 | 0x01 | forward | ignored |
//! | 0x00 | 0x02 | backward | ignored |
//! | 0x00 | 0x03 | turn left | ignored |
//! | 0x00 | 0x04 | turn right | ignored |
//! | 0x02 | 0x01 | left speed | duty cycle 0-100 |
//! | 0x02 | 0x02 | right speed | duty cycle 0-100 |
//! | 0x04 | 0x00 | headlight on | ignored |
//! | 0x04 | 0x01 | headlight off | ignored |

use super::constants::*;
use super::framer::Frame;
use crate::core::types::{Drivetrain, Headlight};
use std::fmt;

/// Typed command decoded from a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Drive(Drivetrain),
    /// Raw argument; may exceed 100 when sent by a misbehaving peer
    SetLeftSpeed(u8),
    SetRightSpeed(u8),
    Headlight(Headlight),
}

/// `(opcode, subcode)` pair with no table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCommand(pub Frame);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown command: opcode=0x{:02X} subcode=0x{:02X}",
            self.0.opcode, self.0.subcode
        )
    }
}

impl std::error::Error for UnknownCommand {}

impl Command {
    /// Look a frame up in the command table
    pub fn decode(frame: Frame) -> Result<Command, UnknownCommand> {
        let cmd = match (frame.opcode, frame.subcode) {
            (OP_DRIVE, DRIVE_STOP) => Command::Drive(Drivetrain::Stopped),
            (OP_DRIVE, DRIVE_FORWARD) => Command::Drive(Drivetrain::Forward),
            (OP_DRIVE, DRIVE_BACKWARD) => Command::Drive(Drivetrain::Backward),
            (OP_DRIVE, DRIVE_LEFT) => Command::Drive(Drivetrain::TurningLeft),
            (OP_DRIVE, DRIVE_RIGHT) => Command::Drive(Drivetrain::TurningRight),
            (OP_SPEED, SPEED_LEFT) => Command::SetLeftSpeed(frame.argument),
            (OP_SPEED, SPEED_RIGHT) => Command::SetRightSpeed(frame.argument),
            (OP_LIGHT, LIGHT_ON) => Command::Headlight(Headlight::On),
            (OP_LIGHT, LIGHT_OFF) => Command::Headlight(Headlight::Off),
            _ => return Err(UnknownCommand(frame)),
        };
        Ok(cmd)
    }

    /// Encode back into a frame (argument 0 where the table ignores it)
    pub const fn to_frame(self) -> Frame {
        match self {
            Command::Drive(dt) => {
                let subcode = match dt {
                    Drivetrain::Stopped => DRIVE_STOP,
                    Drivetrain::Forward => DRIVE_FORWARD,
                    Drivetrain::Backward => DRIVE_BACKWARD,
                    Drivetrain::TurningLeft => DRIVE_LEFT,
                    Drivetrain::TurningRight => DRIVE_RIGHT,
                };
                Frame::new(OP_DRIVE, subcode, 0)
            }
            Command::SetLeftSpeed(speed) => Frame::new(OP_SPEED, SPEED_LEFT, speed),
            Command::SetRightSpeed(speed) => Frame::new(OP_SPEED, SPEED_RIGHT, speed),
            Command::Headlight(Headlight::On) => Frame::new(OP_LIGHT, LIGHT_ON, 0),
            Command::Headlight(Headlight::Off) => Frame::new(OP_LIGHT, LIGHT_OFF, 0),
        }
    }

    /// Wire bytes for this command
    pub const fn to_bytes(self) -> [u8; FRAME_LEN] {
        self.to_frame().to_bytes()
    }
}

impl TryFrom<Frame> for Command {
    type Error = UnknownCommand;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        Command::decode(frame)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Drive(dt) => write!(f, "drive {}", dt),
            Command::SetLeftSpeed(s) => write!(f, "left speed {}", s),
            Command::SetRightSpeed(s) => write!(f, "right speed {}", s),
            Command::Headlight(Headlight::On) => f.write_str("headlight on"),
            Command::Headlight(Headlight::Off) => f.write_str("headlight off"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_drive_table() {
        let cases = [
            (0x00, Drivetrain::Stopped),
            (0x01, Drivetrain::Forward),
            (0x02, Drivetrain::Backward),
            (0x03, Drivetrain::TurningLeft),
            (0x04, Drivetrain::TurningRight),
        ];
        for (subcode, expected) in cases {
            // Argument is ignored for direction commands
            let cmd = Command::decode(Frame::new(0x00, subcode, 0x5A)).unwrap();
            assert_eq!(cmd, Command::Drive(expected));
        }
    }

    #[test]
    fn test_decode_speed_carries_argument() {
        assert_eq!(
            Command::decode(Frame::new(0x02, 0x01, 100)).unwrap(),
            Command::SetLeftSpeed(100)
        );
        assert_eq!(
            Command::decode(Frame::new(0x02, 0x02, 0x32)).unwrap(),
            Command::SetRightSpeed(50)
        );
        // Out-of-range values are passed through; the dispatcher clamps
        assert_eq!(
            Command::decode(Frame::new(0x02, 0x01, 0xC8)).unwrap(),
            Command::SetLeftSpeed(200)
        );
    }

    #[test]
    fn test_decode_light() {
        assert_eq!(
            Command::decode(Frame::new(0x04, 0x00, 0x00)).unwrap(),
            Command::Headlight(Headlight::On)
        );
        assert_eq!(
            Command::decode(Frame::new(0x04, 0x01, 0x00)).unwrap(),
            Command::Headlight(Headlight::Off)
        );
    }

    #[test]
    fn test_decode_unknown() {
        let frame = Frame::new(0x99, 0x00, 0x00);
        assert_eq!(Command::decode(frame), Err(UnknownCommand(frame)));
        // Known opcode, unknown subcode
        assert!(Command::decode(Frame::new(0x00, 0x05, 0x00)).is_err());
        assert!(Command::decode(Frame::new(0x02, 0x00, 0x10)).is_err());
        assert!(Command::decode(Frame::new(0x04, 0x02, 0x00)).is_err());
        // Servo opcode of other boards is not part of this rig
        assert!(Command::decode(Frame::new(0x01, 0x01, 0x5A)).is_err());
    }

    #[test]
    fn test_wire_examples() {
        assert_eq!(
            Command::Drive(Drivetrain::Forward).to_bytes(),
            [0xFF, 0x00, 0x01, 0x00, 0xFF]
        );
        assert_eq!(
            Command::SetLeftSpeed(100).to_bytes(),
            [0xFF, 0x02, 0x01, 0x64, 0xFF]
        );
        assert_eq!(
            Command::Headlight(Headlight::On).to_bytes(),
            [0xFF, 0x04, 0x00, 0x00, 0xFF]
        );
    }

    #[test]
    fn test_unknown_command_message() {
        let err = UnknownCommand(Frame::new(0x99, 0x01, 0x00));
        assert_eq!(
            err.to_string(),
            "unknown command: opcode=0x99 subcode=0x01"
        );
    }
}
