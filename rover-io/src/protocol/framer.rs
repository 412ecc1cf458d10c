//! Command framer
//!
//! Segments the control byte stream into 3-byte frames delimited by
//! [`SENTINEL`]. One `Framer` exists per connection and is fed every byte the
//! socket delivers, in order. Output does not depend on how the stream was
//! chunked by the transport.
//!
//! # State Machine
//!
//! ```text
//!            0xFF                        0xFF (3 bytes: emit, else drop)
//!  ┌──────┐ ──────▶ ┌────────────────┐ ─────────────────────────────┐
//!  │ Idle │         │ Collecting(0-3)│                              │
//!  └──────┘ ◀────── └────────────────┘ ──4th byte──▶ ┌─────────┐    │
//!     ▲  ▲    (all other bytes discarded)             │ Overrun │    │
//!     │  └─────────────────── 0xFF ─────────────────── └─────────┘    │
//!     └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! A sentinel seen while collecting always closes the frame, even when the
//! sender meant it as a payload byte. The protocol has no escaping, so
//! payload bytes of 0xFF cannot be represented.

use super::constants::{FRAME_LEN, PAYLOAD_LEN, SENTINEL};

/// One validated command frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    pub opcode: u8,
    pub subcode: u8,
    pub argument: u8,
}

impl Frame {
    pub const fn new(opcode: u8, subcode: u8, argument: u8) -> Self {
        Self {
            opcode,
            subcode,
            argument,
        }
    }

    /// Wire bytes: `FF op sub arg FF`
    pub const fn to_bytes(self) -> [u8; FRAME_LEN] {
        [SENTINEL, self.opcode, self.subcode, self.argument, SENTINEL]
    }
}

/// Payload collected so far. Length is encoded in the variant, so a payload
/// longer than [`PAYLOAD_LEN`] cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payload {
    Empty,
    One(u8),
    Two(u8, u8),
    Full(u8, u8, u8),
}

impl Payload {
    /// Append a byte, `None` when the payload is already full
    fn push(self, byte: u8) -> Option<Payload> {
        match self {
            Payload::Empty => Some(Payload::One(byte)),
            Payload::One(a) => Some(Payload::Two(a, byte)),
            Payload::Two(a, b) => Some(Payload::Full(a, b, byte)),
            Payload::Full(..) => None,
        }
    }

    fn len(self) -> usize {
        match self {
            Payload::Empty => 0,
            Payload::One(_) => 1,
            Payload::Two(..) => 2,
            Payload::Full(..) => PAYLOAD_LEN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for a start sentinel
    Idle,
    /// Start sentinel seen, accumulating payload
    Collecting(Payload),
    /// Payload exceeded 3 bytes; discarding until the next sentinel
    Overrun,
}

/// Framer counters, reported when a session closes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Frames emitted
    pub frames: u64,
    /// Frames closed with the wrong payload length (short or overrun)
    pub dropped: u64,
    /// Bytes discarded outside any frame
    pub discarded_bytes: u64,
}

/// Per-connection framing state machine
#[derive(Debug, Clone)]
pub struct Framer {
    state: State,
    stats: FramerStats,
}

impl Framer {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            stats: FramerStats::default(),
        }
    }

    /// Advance the state machine by one byte
    ///
    /// Returns a frame when `byte` closes a frame with exactly three payload
    /// bytes. Malformed frames are dropped silently (counted in [`stats`]).
    ///
    /// [`stats`]: Framer::stats
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        match self.state {
            State::Idle => {
                if byte == SENTINEL {
                    self.state = State::Collecting(Payload::Empty);
                } else {
                    self.stats.discarded_bytes += 1;
                }
                None
            }
            State::Collecting(payload) if byte == SENTINEL => {
                self.state = State::Idle;
                if let Payload::Full(opcode, subcode, argument) = payload {
                    self.stats.frames += 1;
                    Some(Frame::new(opcode, subcode, argument))
                } else {
                    self.stats.dropped += 1;
                    log::debug!(
                        "Dropping malformed frame: {} payload bytes (expected {})",
                        payload.len(),
                        PAYLOAD_LEN
                    );
                    None
                }
            }
            State::Collecting(payload) => {
                match payload.push(byte) {
                    Some(next) => self.state = State::Collecting(next),
                    None => {
                        self.stats.dropped += 1;
                        log::debug!(
                            "Frame overrun: more than {} payload bytes, resyncing",
                            PAYLOAD_LEN
                        );
                        self.state = State::Overrun;
                    }
                }
                None
            }
            State::Overrun => {
                if byte == SENTINEL {
                    self.state = State::Idle;
                } else {
                    self.stats.discarded_bytes += 1;
                }
                None
            }
        }
    }

    /// Feed a chunk, appending every completed frame to `out`
    pub fn extend(&mut self, bytes: &[u8], out: &mut Vec<Frame>) {
        for &b in bytes {
            if let Some(frame) = self.push(b) {
                out.push(frame);
            }
        }
    }

    /// Lazily feed a chunk, yielding frames as they complete
    pub fn feed<'a>(&'a mut self, bytes: &'a [u8]) -> impl Iterator<Item = Frame> + 'a {
        bytes.iter().filter_map(move |&b| self.push(b))
    }

    /// Drop any partial frame and return to idle
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    /// True when no frame is in progress
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}
