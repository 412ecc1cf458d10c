//! Per-connection command session
//!
//! A session owns one [`Framer`] and the blocking read side of one TCP
//! connection. Every byte read is fed to the framer in order; completed
//! frames are dispatched through the shared controller in arrival order.
//!
//! # Lifecycle
//!
//! ```text
//! 1. Server accepts a peer and spawns a "cmd-session" thread
//! 2. Session reads chunks until EOF, an I/O error, or the running flag clears
//! 3. Server may shut the socket down to end the read early (handover, exit)
//! 4. On close: optional drivetrain stop, statistics logged
//! ```
//!
//! Reads block with no deadline. An idle peer is never timed out; the
//! server ends a blocked read by shutting the socket down.

use crate::config::SessionConfig;
use crate::dispatch::{Outcome, SharedController};
use crate::protocol::framer::FramerStats;
use crate::protocol::{Frame, Framer};
use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Counters reported when a session closes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub bytes_read: u64,
    /// Frames applied (including clamped)
    pub frames_applied: u64,
    pub unknown_commands: u64,
    pub driver_failures: u64,
    pub framer: FramerStats,
}

/// Why the read loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer closed the connection (or the server shut the socket down)
    Eof,
    /// Daemon shutting down
    Shutdown,
    /// Socket error
    Io(String),
}

/// One client connection
pub struct Session {
    peer: SocketAddr,
    stream: TcpStream,
    controller: SharedController,
    running: Arc<AtomicBool>,
    config: SessionConfig,
    framer: Framer,
    stats: SessionStats,
}

impl Session {
    pub fn new(
        peer: SocketAddr,
        stream: TcpStream,
        controller: SharedController,
        running: Arc<AtomicBool>,
        config: SessionConfig,
    ) -> Self {
        Self {
            peer,
            stream,
            controller,
            running,
            config,
            framer: Framer::new(),
            stats: SessionStats::default(),
        }
    }

    /// Run until the connection ends
    pub fn run(mut self) -> SessionStats {
        let reason = self.read_loop();
        self.stats.framer = self.framer.stats();

        if self.config.stop_on_disconnect {
            log::info!("{}: session closed, stopping drivetrain", self.peer);
            self.controller.lock().stop();
        }

        match &reason {
            CloseReason::Io(e) => log::error!("{}: connection error: {}", self.peer, e),
            CloseReason::Eof | CloseReason::Shutdown => {}
        }
        let s = &self.stats;
        log::info!(
            "{}: disconnected ({:?}): {} bytes, {} frames applied, {} malformed, {} unknown, {} failed",
            self.peer,
            reason,
            s.bytes_read,
            s.frames_applied,
            s.framer.dropped,
            s.unknown_commands,
            s.driver_failures
        );
        self.stats
    }

    fn read_loop(&mut self) -> CloseReason {
        let mut buf = vec![0u8; self.config.read_chunk.max(1)];
        let mut frames: Vec<Frame> = Vec::with_capacity(4);

        loop {
            if !self.running.load(Ordering::Relaxed) {
                return CloseReason::Shutdown;
            }

            match self.stream.read(&mut buf) {
                Ok(0) => return CloseReason::Eof,
                Ok(n) => {
                    self.stats.bytes_read += n as u64;
                    frames.clear();
                    self.framer.extend(&buf[..n], &mut frames);
                    if !frames.is_empty() {
                        self.dispatch(&frames);
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e)
                    if e.kind() == ErrorKind::ConnectionReset
                        || e.kind() == ErrorKind::ConnectionAborted
                        || e.kind() == ErrorKind::UnexpectedEof =>
                {
                    return CloseReason::Eof;
                }
                Err(e) => return CloseReason::Io(e.to_string()),
            }
        }
    }

    /// Apply a batch of frames under one controller lock, in order
    fn dispatch(&mut self, frames: &[Frame]) {
        let mut controller = self.controller.lock();
        for &frame in frames {
            match controller.dispatch_frame(frame) {
                Outcome::Applied(_) | Outcome::Clamped(_) => self.stats.frames_applied += 1,
                Outcome::Unknown(_) => self.stats.unknown_commands += 1,
                Outcome::Failed(_) => self.stats.driver_failures += 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Drivetrain;
    use crate::devices::mock::MockActuator;
    use crate::dispatch::ActuatorController;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    fn pair() -> (TcpStream, TcpStream, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, peer) = listener.accept().unwrap();
        (client, server, peer)
    }

    fn shared() -> SharedController {
        ActuatorController::new(Box::new(MockActuator::new())).into_shared()
    }

    #[test]
    fn test_session_dispatches_until_eof() {
        let (mut client, server, peer) = pair();
        let controller = shared();
        let running = Arc::new(AtomicBool::new(true));
        let config = SessionConfig {
            stop_on_disconnect: false,
            ..SessionConfig::default()
        };
        let session = Session::new(peer, server, Arc::clone(&controller), running, config);
        let handle = thread::spawn(move || session.run());

        // Split mid-frame, then an unknown command and a malformed frame
        client.write_all(&[0xFF, 0x00]).unwrap();
        client.write_all(&[0x01, 0x00, 0xFF]).unwrap();
        client.write_all(&[0xFF, 0x99, 0x00, 0x00, 0xFF]).unwrap();
        client.write_all(&[0xFF, 0x02, 0xFF]).unwrap();
        drop(client);

        let stats = handle.join().unwrap();
        assert_eq!(stats.bytes_read, 13);
        assert_eq!(stats.frames_applied, 1);
        assert_eq!(stats.unknown_commands, 1);
        assert_eq!(stats.framer.dropped, 1);
        assert_eq!(controller.lock().state().drivetrain, Drivetrain::Forward);
    }

    #[test]
    fn test_stop_on_disconnect() {
        let (mut client, server, peer) = pair();
        let controller = shared();
        let running = Arc::new(AtomicBool::new(true));
        let session = Session::new(
            peer,
            server,
            Arc::clone(&controller),
            running,
            SessionConfig::default(),
        );
        let handle = thread::spawn(move || session.run());

        client.write_all(&[0xFF, 0x00, 0x02, 0x00, 0xFF]).unwrap();
        drop(client);
        handle.join().unwrap();
        assert_eq!(controller.lock().state().drivetrain, Drivetrain::Stopped);
    }

    #[test]
    fn test_socket_shutdown_ends_idle_session() {
        let (_client, server, peer) = pair();
        let control = server.try_clone().unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let session = Session::new(
            peer,
            server,
            shared(),
            Arc::clone(&running),
            SessionConfig::default(),
        );
        let handle = thread::spawn(move || session.run());

        // Peer stays connected but silent; only the shutdown unblocks the read
        thread::sleep(std::time::Duration::from_millis(20));
        running.store(false, Ordering::Relaxed);
        control.shutdown(std::net::Shutdown::Both).unwrap();
        let stats = handle.join().unwrap();
        assert_eq!(stats.bytes_read, 0);
    }
}
