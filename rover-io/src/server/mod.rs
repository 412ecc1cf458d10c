//! Command protocol server
//!
//! Listens on one TCP port and serves a single controlling client at a time.
//!
//! # Handover
//!
//! The last connection wins. When a new peer connects while a session is
//! active, the old socket is shut down (unblocking its pending read), its
//! thread is joined, and only then does the new session start. Commands from
//! two peers are therefore never interleaved.
//!
//! ```text
//!  accept loop (10 ms poll) ──new peer──▶ shutdown old ─▶ join old ─▶ spawn new
//!        │
//!        └── running == false ──▶ shutdown active ─▶ join ─▶ return
//! ```
//!
//! A session is its own fault boundary: a panicked session thread or a
//! failed spawn is logged and the loop keeps accepting.

pub mod session;

pub use session::{CloseReason, Session, SessionStats};

use crate::config::{NetworkConfig, SessionConfig};
use crate::dispatch::SharedController;
use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Accept poll interval
const ACCEPT_POLL: Duration = Duration::from_millis(10);

struct ActiveSession {
    peer: SocketAddr,
    /// Second handle on the session socket, used to unblock its read
    stream: TcpStream,
    handle: JoinHandle<SessionStats>,
}

impl ActiveSession {
    /// Shut the socket down and wait for the session thread
    fn close(self) -> Result<SessionStats> {
        // Fails with NotConnected when the peer already left
        let _ = self.stream.shutdown(Shutdown::Both);
        self.handle.join().map_err(|_| Error::ThreadPanic)
    }
}

/// TCP command server
pub struct CommandServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    controller: SharedController,
    running: Arc<AtomicBool>,
    session_config: SessionConfig,
    active: Option<ActiveSession>,
    sessions_served: u64,
}

impl CommandServer {
    /// Bind the listening socket
    pub fn bind(
        config: &NetworkConfig,
        controller: SharedController,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let addr = config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .map_err(|e| Error::Other(format!("Failed to bind to {}: {}", addr, e)))?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        log::info!("Command server listening on {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            controller,
            running,
            session_config: SessionConfig::default(),
            active: None,
            sessions_served: 0,
        })
    }

    /// Per-session behaviour for subsequent connections
    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Bound address (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until the running flag clears
    pub fn run(&mut self) -> Result<()> {
        while self.running.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, peer)) => self.handover(stream, peer),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    self.reap_finished();
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    log::error!("Accept error: {}", e);
                    thread::sleep(ACCEPT_POLL);
                }
            }
        }

        log::info!("Command server stopping");
        if let Some(active) = self.active.take() {
            self.retire(active);
        }
        log::info!(
            "Command server stopped after {} session(s)",
            self.sessions_served
        );
        Ok(())
    }

    /// End the current session (if any) and start one for `stream`
    fn handover(&mut self, stream: TcpStream, peer: SocketAddr) {
        if let Some(old) = self.active.take() {
            log::info!("{} replaces active client {}", peer, old.peer);
            self.retire(old);
        }
        log::info!("Client connected: {}", peer);

        // Accepted sockets may inherit non-blocking mode from the listener
        if let Err(e) = stream.set_nonblocking(false) {
            log::error!("{}: failed to set blocking mode: {}", peer, e);
            return;
        }
        let control = match stream.try_clone() {
            Ok(s) => s,
            Err(e) => {
                log::error!("{}: failed to clone socket: {}", peer, e);
                return;
            }
        };

        let session = Session::new(
            peer,
            stream,
            Arc::clone(&self.controller),
            Arc::clone(&self.running),
            self.session_config.clone(),
        );
        let handle = match thread::Builder::new()
            .name("cmd-session".to_string())
            .spawn(move || session.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                // The closure owned the socket; dropping it disconnects the peer
                log::error!("{}: failed to spawn session thread: {}", peer, e);
                return;
            }
        };

        self.sessions_served += 1;
        self.active = Some(ActiveSession {
            peer,
            stream: control,
            handle,
        });
    }

    /// Join a session whose peer has already gone
    fn reap_finished(&mut self) {
        if self
            .active
            .as_ref()
            .is_some_and(|a| a.handle.is_finished())
            && let Some(done) = self.active.take()
        {
            self.retire(done);
        }
    }

    /// Close and join a session; failures end that session only
    fn retire(&self, session: ActiveSession) {
        let peer = session.peer;
        if let Err(e) = session.close() {
            log::error!("Session {}: {}", peer, e);
            // The session never reached its own disconnect handling
            if self.session_config.stop_on_disconnect {
                let outcome = self.controller.lock().stop();
                log::warn!("{}: drivetrain stop after failed session: {:?}", peer, outcome);
            }
        }
    }
}
