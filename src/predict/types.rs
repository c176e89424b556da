use chrono::{DateTime, FixedOffset, Local, Utc};
use serde::Serialize;

/// A predicted pass in native units: UTC times, radians.
///
/// Field order is the export record order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pass {
    pub rise_time: DateTime<Utc>,
    pub rise_azimuth: f64,
    pub max_time: DateTime<Utc>,
    pub max_altitude: f64,
    pub set_time: DateTime<Utc>,
    pub set_azimuth: f64,
}

/// A pass converted for people: observer-local times, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocalPass {
    pub rise_time: DateTime<FixedOffset>,
    pub rise_azimuth: f64,
    pub max_time: DateTime<FixedOffset>,
    pub max_altitude: f64,
    pub set_time: DateTime<FixedOffset>,
    pub set_azimuth: f64,
}

/// Time zone passes are reported in.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum LocalZone {
    /// Whatever the host is configured with.
    #[default]
    System,
    Fixed(FixedOffset),
}

impl LocalZone {
    pub fn convert(&self, utc: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            LocalZone::System => utc.with_timezone(&Local).fixed_offset(),
            LocalZone::Fixed(offset) => utc.with_timezone(offset),
        }
    }
}

impl Pass {
    pub fn to_local(&self, zone: LocalZone) -> LocalPass {
        LocalPass {
            rise_time: zone.convert(self.rise_time),
            rise_azimuth: azimuth_deg(self.rise_azimuth),
            max_time: zone.convert(self.max_time),
            max_altitude: self.max_altitude.to_degrees().clamp(-90.0, 90.0),
            set_time: zone.convert(self.set_time),
            set_azimuth: azimuth_deg(self.set_azimuth),
        }
    }
}

/// Degrees in [0, 360). `rem_euclid` rounds tiny negatives up to exactly 360.
fn azimuth_deg(rad: f64) -> f64 {
    let deg = rad.to_degrees().rem_euclid(360.0);
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}
