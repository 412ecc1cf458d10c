//! Constants for the rover command protocol

// Frame delimiter (start and end)
pub const SENTINEL: u8 = 0xFF;

// Frame sizes
pub const PAYLOAD_LEN: usize = 3;
pub const FRAME_LEN: usize = PAYLOAD_LEN + 2; // SENTINEL + payload + SENTINEL

// Opcodes (first payload byte)
pub const OP_DRIVE: u8 = 0x00; // Drivetrain direction
pub const OP_SPEED: u8 = 0x02; // Motor PWM duty cycle
pub const OP_LIGHT: u8 = 0x04; // Headlight

// Drive subcodes
pub const DRIVE_STOP: u8 = 0x00;
pub const DRIVE_FORWARD: u8 = 0x01;
pub const DRIVE_BACKWARD: u8 = 0x02;
pub const DRIVE_LEFT: u8 = 0x03;
pub const DRIVE_RIGHT: u8 = 0x04;

// Speed subcodes (argument = duty cycle 0-100)
pub const SPEED_LEFT: u8 = 0x01;
pub const SPEED_RIGHT: u8 = 0x02;

// Light subcodes
pub const LIGHT_ON: u8 = 0x00;
pub const LIGHT_OFF: u8 = 0x01;

// Default control port on the rig
pub const DEFAULT_PORT: u16 = 8081;
