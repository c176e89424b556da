use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ephemeris::LookAngles;

/// Look angles in degrees, unrounded. Rounding is left to whatever prints them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub azimuth_deg: f64,
    pub altitude_deg: f64,
    pub sub_latitude_deg: f64,
    pub sub_longitude_deg: f64,
}

impl From<LookAngles> for Position {
    fn from(angles: LookAngles) -> Self {
        Self {
            azimuth_deg: angles.azimuth_rad.to_degrees(),
            altitude_deg: angles.altitude_rad.to_degrees(),
            sub_latitude_deg: angles.sub_latitude_rad.to_degrees(),
            sub_longitude_deg: angles.sub_longitude_rad.to_degrees(),
        }
    }
}

/// Outcome of one position computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Fix {
    Active(Position),
    /// The computation failed; the reason is kept for inspection.
    Inactive(String),
}

/// One published position update. Replaced as a whole, never patched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingState {
    pub cycle: u64,
    pub updated: Option<DateTime<Utc>>,
    pub fix: Fix,
}

impl Default for TrackingState {
    fn default() -> Self {
        Self {
            cycle: 0,
            updated: None,
            fix: Fix::Inactive("no position computed yet".to_string()),
        }
    }
}

impl TrackingState {
    pub fn is_active(&self) -> bool {
        matches!(self.fix, Fix::Active(_))
    }

    pub fn position(&self) -> Option<&Position> {
        match &self.fix {
            Fix::Active(position) => Some(position),
            Fix::Inactive(_) => None,
        }
    }
}
