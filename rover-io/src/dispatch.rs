//! Actuator dispatcher
//!
//! Maps decoded frames onto driver transitions. [`ActuatorController`] is the
//! only owner of the driver and of the process-wide [`ActuatorState`]; the
//! server shares it behind a mutex so sessions never mutate outputs
//! concurrently.
//!
//! Nothing that arrives over the wire is fatal here: unknown commands are
//! logged and dropped, out-of-range speeds are clamped, driver errors are
//! logged and leave the state untouched.

use crate::core::driver::ActuatorDriver;
use crate::core::types::{ActuatorState, Drivetrain, MAX_SPEED};
use crate::error::Result;
use crate::protocol::{Command, Frame, UnknownCommand};
use parking_lot::Mutex;
use std::sync::Arc;

/// Controller handle shared between the server and its sessions
pub type SharedController = Arc<Mutex<ActuatorController>>;

/// Result of dispatching one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Command applied as received
    Applied(Command),
    /// Speed above [`MAX_SPEED`]; the clamped command was applied
    Clamped(Command),
    /// No table entry; state unchanged
    Unknown(UnknownCommand),
    /// Driver rejected the transition; state unchanged
    Failed(Command),
}

/// Single owner of the actuator driver and state
pub struct ActuatorController {
    driver: Box<dyn ActuatorDriver>,
    state: ActuatorState,
}

impl ActuatorController {
    /// Take ownership of an initialized driver
    pub fn new(driver: Box<dyn ActuatorDriver>) -> Self {
        Self {
            driver,
            state: ActuatorState::default(),
        }
    }

    /// Initialize the driver and take ownership of it
    pub fn with_initialized(mut driver: Box<dyn ActuatorDriver>) -> Result<Self> {
        driver.initialize()?;
        Ok(Self::new(driver))
    }

    /// Decode a frame and apply it
    pub fn dispatch_frame(&mut self, frame: Frame) -> Outcome {
        match Command::decode(frame) {
            Ok(cmd) => self.apply(cmd),
            Err(unknown) => {
                log::warn!("{}", unknown);
                Outcome::Unknown(unknown)
            }
        }
    }

    /// Apply a typed command
    pub fn apply(&mut self, cmd: Command) -> Outcome {
        let (cmd, clamped) = clamp(cmd);
        if clamped {
            log::warn!("Speed out of range, clamped to {}: {}", MAX_SPEED, cmd);
        }

        let result = match cmd {
            Command::Drive(dt) => self.driver.set_drivetrain(dt),
            Command::SetLeftSpeed(speed) => self.driver.set_left_speed(speed),
            Command::SetRightSpeed(speed) => self.driver.set_right_speed(speed),
            Command::Headlight(light) => self.driver.set_headlight(light),
        };

        if let Err(e) = result {
            log::error!("Driver rejected '{}': {}", cmd, e);
            return Outcome::Failed(cmd);
        }

        match cmd {
            Command::Drive(dt) => self.state.drivetrain = dt,
            Command::SetLeftSpeed(speed) => self.state.left_speed = speed,
            Command::SetRightSpeed(speed) => self.state.right_speed = speed,
            Command::Headlight(light) => self.state.headlight = light,
        }
        log::debug!("Applied {}", cmd);

        if clamped {
            Outcome::Clamped(cmd)
        } else {
            Outcome::Applied(cmd)
        }
    }

    /// Wrap in the shared handle used by the server
    pub fn into_shared(self) -> SharedController {
        Arc::new(Mutex::new(self))
    }

    /// Snapshot of the last applied state
    pub fn state(&self) -> ActuatorState {
        self.state
    }

    /// Command the drivetrain to stop
    pub fn stop(&mut self) -> Outcome {
        self.apply(Command::Drive(Drivetrain::Stopped))
    }

    /// Stop and release the hardware
    pub fn shutdown(&mut self) -> Result<()> {
        self.stop();
        self.driver.shutdown()
    }
}

fn clamp(cmd: Command) -> (Command, bool) {
    match cmd {
        Command::SetLeftSpeed(s) if s > MAX_SPEED => (Command::SetLeftSpeed(MAX_SPEED), true),
        Command::SetRightSpeed(s) if s > MAX_SPEED => (Command::SetRightSpeed(MAX_SPEED), true),
        other => (other, false),
    }
}
