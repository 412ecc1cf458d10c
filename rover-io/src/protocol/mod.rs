//! Rover command protocol
//!
//! Packet format: [0xFF] [OPCODE] [SUBCODE] [ARGUMENT] [0xFF]
//!
//! This module provides:
//! - `Framer`: Byte-at-a-time state machine that carves frames out of the stream
//! - `Frame`: One validated 3-byte payload
//! - `Command`: Typed command decoded from a frame through the dispatch table

pub mod command;
pub mod constants;
pub mod framer;

pub use command::{Command, UnknownCommand};
pub use framer::{Frame, Framer};
