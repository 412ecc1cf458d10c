//! Mock actuator driver for testing
//!
//! Records every call instead of touching hardware. Clones share state, so a
//! test can keep a handle while the controller owns the boxed driver.

use crate::core::driver::ActuatorDriver;
use crate::core::types::{ActuatorState, Drivetrain, Headlight};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// One recorded driver call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCall {
    Initialize,
    Drivetrain(Drivetrain),
    LeftSpeed(u8),
    RightSpeed(u8),
    Headlight(Headlight),
    Shutdown,
}

#[derive(Debug, Default)]
struct MockState {
    outputs: ActuatorState,
    calls: Vec<DriverCall>,
    initialized: bool,
    fail_next: bool,
}

/// Mock actuator driver
#[derive(Clone, Default)]
pub struct MockActuator {
    state: Arc<Mutex<MockState>>,
}

impl MockActuator {
    /// Create new mock actuator
    pub fn new() -> Self {
        Self::default()
    }

    /// Outputs as last applied
    pub fn outputs(&self) -> ActuatorState {
        self.state.lock().outputs
    }

    /// All calls so far, oldest first
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Make the next transition call fail without changing outputs
    pub fn fail_next(&self) {
        self.state.lock().fail_next = true;
    }

    fn record(&self, call: DriverCall, apply: impl FnOnce(&mut ActuatorState)) -> Result<()> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next) {
            return Err(Error::Other(format!("mock failure on {:?}", call)));
        }
        state.calls.push(call);
        apply(&mut state.outputs);
        Ok(())
    }
}

impl ActuatorDriver for MockActuator {
    fn initialize(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.initialized = true;
        state.outputs = ActuatorState::default();
        state.calls.push(DriverCall::Initialize);
        log::info!("Mock: actuator initialized");
        Ok(())
    }

    fn set_drivetrain(&mut self, drivetrain: Drivetrain) -> Result<()> {
        self.record(DriverCall::Drivetrain(drivetrain), |o| o.drivetrain = drivetrain)
    }

    fn set_left_speed(&mut self, speed: u8) -> Result<()> {
        self.record(DriverCall::LeftSpeed(speed), |o| o.left_speed = speed)
    }

    fn set_right_speed(&mut self, speed: u8) -> Result<()> {
        self.record(DriverCall::RightSpeed(speed), |o| o.right_speed = speed)
    }

    fn set_headlight(&mut self, headlight: Headlight) -> Result<()> {
        self.record(DriverCall::Headlight(headlight), |o| o.headlight = headlight)
    }

    fn shutdown(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.outputs.drivetrain = Drivetrain::Stopped;
        state.initialized = false;
        state.calls.push(DriverCall::Shutdown);
        log::info!("Mock: actuator shut down");
        Ok(())
    }
}
