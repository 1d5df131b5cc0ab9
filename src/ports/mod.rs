//! Actuator and sensor collaborators.
//!
//! Handlers never touch hardware directly; they call these traits through
//! the environment carried by their [`Context`](crate::hsm::Context).
//! Real hardware adapters and the in-memory [`sim`] world implement them.

pub mod sim;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Rejected actuator commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActuatorError {
    #[error("Motor speed {0} outside -100..=100")]
    SpeedOutOfRange(i16),
}

/// Signed motor duty in percent, `-100..=100`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MotorSpeed(i8);

impl MotorSpeed {
    pub const MAX: i16 = 100;
    pub const STOP: MotorSpeed = MotorSpeed(0);

    /// Out-of-range values are rejected, never clamped.
    pub fn new(speed: i16) -> Result<Self, ActuatorError> {
        if !(-Self::MAX..=Self::MAX).contains(&speed) {
            return Err(ActuatorError::SpeedOutOfRange(speed));
        }
        Ok(Self(speed as i8))
    }

    pub fn value(self) -> i16 {
        i16::from(self.0)
    }
}

/// Differential drive.
pub trait Drive {
    fn set_left(&mut self, speed: i16) -> Result<(), ActuatorError>;

    fn set_right(&mut self, speed: i16) -> Result<(), ActuatorError>;

    fn set_speeds(&mut self, left: i16, right: i16) -> Result<(), ActuatorError> {
        self.set_left(left)?;
        self.set_right(right)
    }

    fn stop(&mut self) -> Result<(), ActuatorError> {
        self.set_speeds(0, 0)
    }
}

/// Momentary actuator that fires a ball.
pub trait Solenoid {
    fn pulse(&mut self);
}

/// Sampled sensor inputs.
pub trait SensorBus {
    /// Bumper switch bit mask.
    fn bumpers(&self) -> u8;
    /// Tape sensor bit mask.
    fn tape(&self) -> u8;
    /// Beacon detector bit mask.
    fn beacon(&self) -> u8;
    /// Track wire amplifier ADC reading.
    fn track_wire(&self) -> u16;
    /// Battery ADC reading.
    fn battery(&self) -> u16;
}

/// Surface an actuator rejection.
///
/// An out-of-range command is a bug in the handler that issued it: it is
/// logged, and in debug builds it panics. Returns whether the command was
/// accepted.
pub fn enforce_command(result: Result<(), ActuatorError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            error!(error = %err, "Invalid actuator command");
            if cfg!(debug_assertions) {
                panic!("invalid actuator command: {err}");
            }
            false
        }
    }
}
