//! Device implementations

pub mod mock;

#[cfg(all(feature = "gpio", target_os = "linux"))]
pub mod gpio;

use crate::config::DeviceConfig;
use crate::core::driver::ActuatorDriver;
use crate::error::{Error, Result};
use mock::MockActuator;

/// Create an actuator driver based on configuration
pub fn create_device(config: &DeviceConfig) -> Result<Box<dyn ActuatorDriver>> {
    match config.device_type.as_str() {
        "mock" => Ok(Box::new(MockActuator::new())),
        #[cfg(all(feature = "gpio", target_os = "linux"))]
        "gpio" => {
            let driver = gpio::GpioActuator::new(config.clone())?;
            Ok(Box::new(driver))
        }
        #[cfg(not(all(feature = "gpio", target_os = "linux")))]
        "gpio" => Err(Error::Config(
            "device type 'gpio' requires a Linux build with the `gpio` feature".to_string(),
        )),
        _ => Err(Error::UnknownDevice(config.device_type.clone())),
    }
}
