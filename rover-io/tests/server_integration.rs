//! End-to-end tests: real loopback sockets, mock actuator.

use rover_io::config::{NetworkConfig, SessionConfig};
use rover_io::devices::mock::{DriverCall, MockActuator};
use rover_io::{
    ActuatorController, ActuatorDriver, CommandServer, Drivetrain, Headlight, SharedController,
};
use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

struct Harness {
    addr: SocketAddr,
    mock: MockActuator,
    controller: SharedController,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<rover_io::Result<()>>>,
}

impl Harness {
    fn start(stop_on_disconnect: bool) -> Self {
        let mock = MockActuator::new();
        Self::with_driver(Box::new(mock.clone()), mock, stop_on_disconnect)
    }

    /// `mock` must be the recorder behind `driver`
    fn with_driver(
        driver: Box<dyn ActuatorDriver>,
        mock: MockActuator,
        stop_on_disconnect: bool,
    ) -> Self {
        let controller = ActuatorController::with_initialized(driver)
            .unwrap()
            .into_shared();
        let running = Arc::new(AtomicBool::new(true));
        let network = NetworkConfig {
            bind_address: "127.0.0.1:0".to_string(),
        };
        let mut server = CommandServer::bind(&network, Arc::clone(&controller), Arc::clone(&running))
            .unwrap()
            .with_session_config(SessionConfig {
                stop_on_disconnect,
                ..SessionConfig::default()
            });
        let addr = server.local_addr();
        let handle = thread::spawn(move || server.run());

        Self {
            addr,
            mock,
            controller,
            running,
            handle: Some(handle),
        }
    }

    fn connect(&self) -> TcpStream {
        TcpStream::connect(self.addr).unwrap()
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap().unwrap();
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Mock driver whose first drivetrain change panics
struct PanicOnce {
    mock: MockActuator,
    tripped: Arc<AtomicBool>,
}

impl ActuatorDriver for PanicOnce {
    fn initialize(&mut self) -> rover_io::Result<()> {
        self.mock.initialize()
    }

    fn set_drivetrain(&mut self, drivetrain: Drivetrain) -> rover_io::Result<()> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            panic!("driver fault");
        }
        self.mock.set_drivetrain(drivetrain)
    }

    fn set_left_speed(&mut self, speed: u8) -> rover_io::Result<()> {
        self.mock.set_left_speed(speed)
    }

    fn set_right_speed(&mut self, speed: u8) -> rover_io::Result<()> {
        self.mock.set_right_speed(speed)
    }

    fn set_headlight(&mut self, headlight: Headlight) -> rover_io::Result<()> {
        self.mock.set_headlight(headlight)
    }

    fn shutdown(&mut self) -> rover_io::Result<()> {
        self.mock.shutdown()
    }
}

/// Poll until `cond` holds or two seconds pass
fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn test_commands_applied_in_order() {
    let harness = Harness::start(false);
    let mut client = harness.connect();

    // Noise, a split frame, then two more frames in one write
    client.write_all(&[0x00, 0x13, 0xFF, 0x02]).unwrap();
    client.flush().unwrap();
    thread::sleep(Duration::from_millis(20));
    client
        .write_all(&[0x01, 0x32, 0xFF, 0xFF, 0x00, 0x01, 0x00, 0xFF, 0xFF, 0x04, 0x01, 0x00, 0xFF])
        .unwrap();

    assert!(wait_until(|| harness.mock.outputs().headlight == Headlight::Off));
    let state = harness.controller.lock().state();
    assert_eq!(state.left_speed, 50);
    assert_eq!(state.right_speed, 100);
    assert_eq!(state.drivetrain, Drivetrain::Forward);
}

#[test]
fn test_garbage_does_not_end_session() {
    let harness = Harness::start(false);
    let mut client = harness.connect();

    client.write_all(&[0xFF, 1, 2, 3, 4, 5, 6, 7, 0xFF]).unwrap();
    client.write_all(&[0xFF, 0x99, 0x00, 0x00, 0xFF]).unwrap();
    client.write_all(&[0xFF, 0x00, 0x02, 0x00, 0xFF]).unwrap();

    assert!(wait_until(|| harness.mock.outputs().drivetrain == Drivetrain::Backward));
}

#[test]
fn test_last_connection_wins() {
    let harness = Harness::start(false);

    let mut first = harness.connect();
    first.write_all(&[0xFF, 0x00, 0x01, 0x00, 0xFF]).unwrap();
    assert!(wait_until(|| harness.mock.outputs().drivetrain == Drivetrain::Forward));

    let mut second = harness.connect();
    second.write_all(&[0xFF, 0x00, 0x03, 0x00, 0xFF]).unwrap();
    assert!(wait_until(|| harness.mock.outputs().drivetrain == Drivetrain::TurningLeft));

    // The replaced client is no longer read; the write itself may or may not fail
    let _ = first.write_all(&[0xFF, 0x04, 0x01, 0x00, 0xFF]);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(harness.mock.outputs().headlight, Headlight::On);

    second.write_all(&[0xFF, 0x04, 0x01, 0x00, 0xFF]).unwrap();
    assert!(wait_until(|| harness.mock.outputs().headlight == Headlight::Off));
}

#[test]
fn test_disconnect_stops_drivetrain() {
    let harness = Harness::start(true);

    let mut client = harness.connect();
    client.write_all(&[0xFF, 0x00, 0x01, 0x00, 0xFF]).unwrap();
    assert!(wait_until(|| harness.mock.outputs().drivetrain == Drivetrain::Forward));

    drop(client);
    assert!(wait_until(|| harness.mock.outputs().drivetrain == Drivetrain::Stopped));
}

#[test]
fn test_shutdown_with_active_session() {
    let mut harness = Harness::start(true);
    let mut client = harness.connect();
    client.write_all(&[0xFF, 0x00, 0x04, 0x00, 0xFF]).unwrap();
    assert!(wait_until(|| harness.mock.outputs().drivetrain == Drivetrain::TurningRight));

    let started = Instant::now();
    harness.stop();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(harness.mock.outputs().drivetrain, Drivetrain::Stopped);
}

#[test]
fn test_reconnect_after_disconnect() {
    let harness = Harness::start(false);

    let mut first = harness.connect();
    first.write_all(&[0xFF, 0x02, 0x02, 0x0A, 0xFF]).unwrap();
    assert!(wait_until(|| harness.mock.outputs().right_speed == 10));
    drop(first);

    let mut second = harness.connect();
    second.write_all(&[0xFF, 0x02, 0x02, 0x14, 0xFF]).unwrap();
    assert!(wait_until(|| harness.mock.outputs().right_speed == 20));
}

#[test]
fn test_panicked_session_does_not_end_server() {
    let mock = MockActuator::new();
    let tripped = Arc::new(AtomicBool::new(false));
    let driver = PanicOnce {
        mock: mock.clone(),
        tripped: Arc::clone(&tripped),
    };
    let mut harness = Harness::with_driver(Box::new(driver), mock, true);

    let mut first = harness.connect();
    first.write_all(&[0xFF, 0x02, 0x01, 0x28, 0xFF]).unwrap();
    assert!(wait_until(|| harness.mock.outputs().left_speed == 40));
    first.write_all(&[0xFF, 0x00, 0x01, 0x00, 0xFF]).unwrap();
    assert!(wait_until(|| tripped.load(Ordering::SeqCst)));

    // The failed session is reaped and the drivetrain stopped for it
    assert!(wait_until(|| harness
        .mock
        .calls()
        .contains(&DriverCall::Drivetrain(Drivetrain::Stopped))));

    let mut second = harness.connect();
    second.write_all(&[0xFF, 0x00, 0x02, 0x00, 0xFF]).unwrap();
    assert!(wait_until(|| harness.mock.outputs().drivetrain == Drivetrain::Backward));

    harness.stop();
}
