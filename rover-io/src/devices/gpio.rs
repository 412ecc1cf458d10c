//! Raspberry Pi GPIO actuator driver
//!
//! Drives an L298 dual H-bridge and three LEDs directly from BCM pins.
//!
//! ```text
//!   ENA ──PWM──┐                 ┌──PWM── ENB
//!   IN1 ───────┤  L298  ├──────── IN3
//!   IN2 ───────┘        └──────── IN4
//!   LED0 headlight, LED1/LED2 indicators (active-low)
//! ```
//!
//! Speeds are the duty cycle (0-100) of a software PWM on ENA/ENB. While
//! the drivetrain is stopped both enable lines are held low and speed
//! changes are only remembered.

use crate::config::{DeviceConfig, PinConfig};
use crate::core::driver::ActuatorDriver;
use crate::core::types::{ActuatorState, Drivetrain, Headlight, MAX_SPEED};
use crate::error::{Error, Result};
use rppal::gpio::{Gpio, Level, OutputPin};
use std::thread;
use std::time::Duration;

/// Marquee step duration
const BLINK_STEP: Duration = Duration::from_millis(100);
/// Marquee repetitions
const BLINK_ROUNDS: usize = 3;

struct Pins {
    ena: OutputPin,
    enb: OutputPin,
    /// IN1..IN4
    direction: [OutputPin; 4],
    headlight: OutputPin,
    /// LED1, LED2
    indicators: [OutputPin; 2],
}

impl Pins {
    fn claim(gpio: &Gpio, pins: &PinConfig) -> Result<Self> {
        // LEDs are active-low: claim them high so they start dark
        Ok(Self {
            ena: gpio.get(pins.ena)?.into_output_low(),
            enb: gpio.get(pins.enb)?.into_output_low(),
            direction: [
                gpio.get(pins.in1)?.into_output_low(),
                gpio.get(pins.in2)?.into_output_low(),
                gpio.get(pins.in3)?.into_output_low(),
                gpio.get(pins.in4)?.into_output_low(),
            ],
            headlight: gpio.get(pins.led0)?.into_output_high(),
            indicators: [
                gpio.get(pins.led1)?.into_output_high(),
                gpio.get(pins.led2)?.into_output_high(),
            ],
        })
    }
}

/// GPIO actuator driver
pub struct GpioActuator {
    config: DeviceConfig,
    pins: Option<Pins>,
    state: ActuatorState,
}

impl GpioActuator {
    pub fn new(config: DeviceConfig) -> Result<Self> {
        Ok(Self {
            config,
            pins: None,
            state: ActuatorState::default(),
        })
    }

    fn pins(&mut self) -> Result<&mut Pins> {
        self.pins
            .as_mut()
            .ok_or_else(|| Error::Gpio("driver not initialized".to_string()))
    }

    fn level(high: bool) -> Level {
        if high { Level::High } else { Level::Low }
    }

    /// Drive one enable line: PWM at `speed` when moving, low otherwise
    fn write_enable(pin: &mut OutputPin, moving: bool, speed: u8, freq: f64) -> Result<()> {
        if moving {
            let duty = f64::from(speed.min(MAX_SPEED)) / f64::from(MAX_SPEED);
            pin.set_pwm_frequency(freq, duty)?;
        } else {
            pin.clear_pwm()?;
            pin.set_low();
        }
        Ok(())
    }

    fn startup_marquee(&mut self) -> Result<()> {
        log::info!("GPIO: startup marquee");
        let pins = self.pins()?;
        for _ in 0..BLINK_ROUNDS {
            for step in 0..3 {
                let lit = |i: usize| Self::level(i != step);
                pins.indicators[0].write(lit(0));
                pins.indicators[1].write(lit(1));
                pins.headlight.write(lit(2));
                thread::sleep(BLINK_STEP);
            }
        }
        Ok(())
    }

    fn apply_state(&mut self, state: ActuatorState) -> Result<()> {
        self.set_headlight(state.headlight)?;
        self.state.left_speed = state.left_speed;
        self.state.right_speed = state.right_speed;
        self.set_drivetrain(state.drivetrain)
    }
}

impl ActuatorDriver for GpioActuator {
    fn initialize(&mut self) -> Result<()> {
        let gpio = Gpio::new()?;
        self.pins = Some(Pins::claim(&gpio, &self.config.pins)?);
        log::info!(
            "GPIO: claimed pins {:?}, PWM {} Hz",
            self.config.pins,
            self.config.pwm_frequency_hz
        );

        if self.config.startup_blink {
            self.startup_marquee()?;
        }
        self.apply_state(ActuatorState::default())
    }

    fn set_drivetrain(&mut self, drivetrain: Drivetrain) -> Result<()> {
        let lines = drivetrain.lines();
        let (left, right) = (self.state.left_speed, self.state.right_speed);
        let freq = self.config.pwm_frequency_hz;
        let pins = self.pins()?;

        for (pin, high) in pins.direction.iter_mut().zip(lines.direction) {
            pin.write(Self::level(high));
        }
        for (pin, high) in pins.indicators.iter_mut().zip(lines.indicators) {
            pin.write(Self::level(high));
        }
        Self::write_enable(&mut pins.ena, lines.enable, left, freq)?;
        Self::write_enable(&mut pins.enb, lines.enable, right, freq)?;

        self.state.drivetrain = drivetrain;
        Ok(())
    }

    fn set_left_speed(&mut self, speed: u8) -> Result<()> {
        let moving = self.state.drivetrain.lines().enable;
        let freq = self.config.pwm_frequency_hz;
        let pins = self.pins()?;
        Self::write_enable(&mut pins.ena, moving, speed, freq)?;
        self.state.left_speed = speed;
        Ok(())
    }

    fn set_right_speed(&mut self, speed: u8) -> Result<()> {
        let moving = self.state.drivetrain.lines().enable;
        let freq = self.config.pwm_frequency_hz;
        let pins = self.pins()?;
        Self::write_enable(&mut pins.enb, moving, speed, freq)?;
        self.state.right_speed = speed;
        Ok(())
    }

    fn set_headlight(&mut self, headlight: Headlight) -> Result<()> {
        let pins = self.pins()?;
        // Active-low
        pins.headlight.write(Self::level(!headlight.is_on()));
        self.state.headlight = headlight;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.pins.is_none() {
            return Ok(());
        }
        self.set_drivetrain(Drivetrain::Stopped)?;
        self.set_headlight(Headlight::Off)?;
        // Dropping the pins resets them to their previous mode
        self.pins = None;
        log::info!("GPIO: pins released");
        Ok(())
    }
}

impl Drop for GpioActuator {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("GPIO: shutdown failed: {}", e);
        }
    }
}
