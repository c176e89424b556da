use strum_macros::Display;

use super::error::MotorError;
use super::motor::{Motor, MotorConfig};
use super::transport::{SerialTransport, Transport};
use crate::config::MotorsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Axis {
    Azimuth,
    Altitude,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::Azimuth, Axis::Altitude];
}

/// Ranges and offsets of both axes, copied out of a controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountLimits {
    pub azimuth: MotorConfig,
    pub altitude: MotorConfig,
}

/// The azimuth (id 0) and altitude (id 1) servos behind one link.
pub struct MotorController {
    transport: Box<dyn Transport>,
    azimuth: Motor,
    altitude: Motor,
}

impl MotorController {
    pub fn new(transport: Box<dyn Transport>, limits: MountLimits) -> Self {
        Self {
            transport,
            azimuth: Motor::new(0, limits.azimuth),
            altitude: Motor::new(1, limits.altitude),
        }
    }

    /// Opens the configured serial port. Failing to open it is an error, not a warning.
    pub fn open(config: &MotorsConfig) -> Result<Self, MotorError> {
        let transport = SerialTransport::open(
            &config.port,
            config.baud_rate,
            config.write_timeout,
        )?;
        Ok(Self::new(
            Box::new(transport),
            MountLimits {
                azimuth: config.azimuth,
                altitude: config.altitude,
            },
        ))
    }

    /// Homes both motors.
    pub fn initialize(&mut self) -> Result<(), MotorError> {
        for axis in Axis::ALL {
            let (motor, transport) = self.split(axis);
            motor.initialize(transport)?;
        }
        Ok(())
    }

    pub fn limits(&self) -> MountLimits {
        MountLimits {
            azimuth: *self.azimuth.config(),
            altitude: *self.altitude.config(),
        }
    }

    pub fn motor(&self, axis: Axis) -> &Motor {
        match axis {
            Axis::Azimuth => &self.azimuth,
            Axis::Altitude => &self.altitude,
        }
    }

    pub fn move_axis(&mut self, axis: Axis, angle: i32) -> Result<(), MotorError> {
        let (motor, transport) = self.split(axis);
        motor.move_to(angle, transport)
    }

    /// Moves one axis towards `target` if it is outside the deadband.
    ///
    /// Returns the commanded whole-degree angle, or `None` when no command was needed.
    pub fn track(&mut self, axis: Axis, target: f64) -> Result<Option<i32>, MotorError> {
        if !self.motor(axis).needs_move(target) {
            return Ok(None);
        }
        let angle = target.trunc() as i32;
        self.move_axis(axis, angle)?;
        Ok(Some(angle))
    }

    fn split(&mut self, axis: Axis) -> (&mut Motor, &mut dyn Transport) {
        let motor = match axis {
            Axis::Azimuth => &mut self.azimuth,
            Axis::Altitude => &mut self.altitude,
        };
        (motor, self.transport.as_mut())
    }
}
