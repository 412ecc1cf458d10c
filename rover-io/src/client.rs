//! Control client
//!
//! Operator-side mirror of the command protocol: encodes [`Command`]s into
//! 5-byte frames and writes them to the daemon. The protocol has no replies,
//! so a successful send only means the bytes reached the socket.
//!
//! ```no_run
//! use rover_io::client::ControlClient;
//! use std::time::Duration;
//!
//! let mut car = ControlClient::connect("192.168.1.1:8081", Duration::from_secs(3))?;
//! car.drive(rover_io::Drivetrain::Forward, 60)?;
//! car.stop()?;
//! # Ok::<(), rover_io::Error>(())
//! ```

use crate::core::types::{Drivetrain, Headlight, MAX_SPEED};
use crate::error::{Error, Result};
use crate::protocol::Command;
use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// TCP control client
pub struct ControlClient {
    stream: TcpStream,
    peer: SocketAddr,
}

impl ControlClient {
    /// Connect to the first address `addr` resolves to
    ///
    /// `timeout` bounds the connect and every write; it must be non-zero.
    pub fn connect<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "timeout must be greater than zero".to_string(),
            ));
        }
        let mut last_err = None;
        for peer in addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&peer, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    stream.set_write_timeout(Some(timeout))?;
                    log::info!("Connected to {}", peer);
                    return Ok(Self { stream, peer });
                }
                Err(e) => {
                    log::debug!("Connect to {} failed: {}", peer, e);
                    last_err = Some(e);
                }
            }
        }
        Err(match last_err {
            Some(e) => Error::Io(e),
            None => Error::InvalidParameter("address resolved to nothing".to_string()),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Write one command frame
    pub fn send(&mut self, cmd: Command) -> Result<()> {
        if let Command::SetLeftSpeed(s) | Command::SetRightSpeed(s) = cmd {
            check_speed(s)?;
        }
        self.stream.write_all(&cmd.to_bytes())?;
        log::debug!("Sent {}", cmd);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.send(Command::Drive(Drivetrain::Stopped))
    }

    pub fn forward(&mut self) -> Result<()> {
        self.send(Command::Drive(Drivetrain::Forward))
    }

    pub fn backward(&mut self) -> Result<()> {
        self.send(Command::Drive(Drivetrain::Backward))
    }

    pub fn turn_left(&mut self) -> Result<()> {
        self.send(Command::Drive(Drivetrain::TurningLeft))
    }

    pub fn turn_right(&mut self) -> Result<()> {
        self.send(Command::Drive(Drivetrain::TurningRight))
    }

    pub fn set_left_speed(&mut self, speed: u8) -> Result<()> {
        self.send(Command::SetLeftSpeed(speed))
    }

    pub fn set_right_speed(&mut self, speed: u8) -> Result<()> {
        self.send(Command::SetRightSpeed(speed))
    }

    /// Set both sides; nothing is written if either value is out of range
    pub fn set_speed(&mut self, left: u8, right: u8) -> Result<()> {
        check_speed(left)?;
        check_speed(right)?;
        self.set_left_speed(left)?;
        self.set_right_speed(right)
    }

    pub fn headlight(&mut self, light: Headlight) -> Result<()> {
        self.send(Command::Headlight(light))
    }

    /// Set both speeds, then the direction
    pub fn drive(&mut self, direction: Drivetrain, speed: u8) -> Result<()> {
        self.set_speed(speed, speed)?;
        self.send(Command::Drive(direction))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.stream.flush()?;
        Ok(())
    }
}

fn check_speed(speed: u8) -> Result<()> {
    if speed > MAX_SPEED {
        return Err(Error::InvalidParameter(format!(
            "speed {} out of range 0-{}",
            speed, MAX_SPEED
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn test_drive_writes_speeds_then_direction() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = ControlClient::connect(addr, Duration::from_secs(1)).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        client.drive(Drivetrain::Forward, 60).unwrap();
        drop(client);

        let mut bytes = Vec::new();
        server.read_to_end(&mut bytes).unwrap();
        assert_eq!(
            bytes,
            vec![
                0xFF, 0x02, 0x01, 60, 0xFF, //
                0xFF, 0x02, 0x02, 60, 0xFF, //
                0xFF, 0x00, 0x01, 0x00, 0xFF,
            ]
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let result = ControlClient::connect(addr, Duration::ZERO);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_out_of_range_speed_writes_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = ControlClient::connect(addr, Duration::from_secs(1)).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        assert!(matches!(
            client.set_left_speed(101),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            client.set_speed(50, 200),
            Err(Error::InvalidParameter(_))
        ));
        drop(client);

        let mut bytes = Vec::new();
        server.read_to_end(&mut bytes).unwrap();
        assert!(bytes.is_empty());
    }
}
