use serde::Deserialize;

use super::error::MotorError;
use super::transport::Transport;

pub const SYNC_BYTE: u8 = 0xFF;

/// Mechanical limits and calibration of one servo, in integer degrees.
///
/// `min_deg`/`max_deg` bound the servo's own angle; `offset_deg` is where the
/// servo's zero points in the real world.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MotorConfig {
    #[serde(default)]
    pub min_deg: i32,
    #[serde(default = "default_max_deg")]
    pub max_deg: i32,
    #[serde(default)]
    pub offset_deg: i32,
    #[serde(default = "default_resolution_deg")]
    pub resolution_deg: f64,
}

fn default_max_deg() -> i32 {
    180
}

fn default_resolution_deg() -> f64 {
    1.0
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            min_deg: 0,
            max_deg: default_max_deg(),
            offset_deg: 0,
            resolution_deg: default_resolution_deg(),
        }
    }
}

impl MotorConfig {
    /// Whether a real-world angle can be reached.
    pub fn accepts(&self, angle: f64) -> bool {
        let low = f64::from(self.min_deg + self.offset_deg);
        let high = f64::from(self.max_deg + self.offset_deg);
        angle >= low && angle <= high
    }
}

#[derive(Debug)]
pub struct Motor {
    id: u8,
    config: MotorConfig,
    current_pos: i32,
}

impl Motor {
    pub fn new(id: u8, config: MotorConfig) -> Self {
        Self {
            id,
            config,
            current_pos: 0,
        }
    }

    pub fn config(&self) -> &MotorConfig {
        &self.config
    }

    /// Last successfully commanded servo angle (offset already removed).
    pub fn current_pos(&self) -> i32 {
        self.current_pos
    }

    /// Last successfully commanded real-world angle.
    pub fn position(&self) -> f64 {
        f64::from(self.current_pos + self.config.offset_deg)
    }

    pub fn needs_move(&self, target: f64) -> bool {
        (target - self.position()).abs() >= self.config.resolution_deg
    }

    /// Validates a real-world angle and builds its command frame.
    pub fn frame(&self, angle: i32) -> Result<[u8; 3], MotorError> {
        let effective = angle - self.config.offset_deg;
        if effective < self.config.min_deg || effective > self.config.max_deg {
            return Err(MotorError::OutOfRange {
                motor: self.id,
                angle: effective,
                min: self.config.min_deg,
                max: self.config.max_deg,
            });
        }
        let byte = u8::try_from(effective).map_err(|_| MotorError::Unencodable {
            motor: self.id,
            angle: effective,
        })?;
        Ok([SYNC_BYTE, self.id, byte])
    }

    /// Sends the motor to a real-world angle.
    ///
    /// Nothing is transmitted when validation fails, and `current_pos` only
    /// changes once the frame has been written.
    pub fn move_to(&mut self, angle: i32, transport: &mut dyn Transport) -> Result<(), MotorError> {
        let frame = self.frame(angle)?;
        transport.send(&frame)?;
        self.current_pos = angle - self.config.offset_deg;
        log::debug!("Motor {} at {}", self.id, self.current_pos);
        Ok(())
    }

    /// Homes to the bottom of the range.
    pub fn initialize(&mut self, transport: &mut dyn Transport) -> Result<(), MotorError> {
        self.move_to(self.config.min_deg + self.config.offset_deg, transport)
    }
}
