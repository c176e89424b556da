mod error;
mod geometry;
#[cfg(test)]
pub mod mock;
mod observer;
mod propagator;
mod target;

pub use error::EphemerisError;
pub use observer::Observer;
pub use propagator::Sgp4Ephemeris;
pub use target::SatelliteTarget;

use crate::predict::Pass;

/// Sky position of a target as seen by an observer, radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    pub azimuth_rad: f64,
    pub altitude_rad: f64,
    pub sub_latitude_rad: f64,
    pub sub_longitude_rad: f64,
}

/// Orbit propagation as seen from the ground.
///
/// Both calls read the observer's clock (`observer.date`) as "now" and must
/// not keep any state between calls: the tracker and the pass predictor share
/// one instance.
pub trait Ephemeris: Send + Sync {
    fn look_at(
        &self,
        target: &SatelliteTarget,
        observer: &Observer,
    ) -> Result<LookAngles, EphemerisError>;

    /// The next complete pass starting after the observer clock, or `None`
    /// when the target never rises within the search window.
    fn next_pass(
        &self,
        target: &SatelliteTarget,
        observer: &Observer,
    ) -> Result<Option<Pass>, EphemerisError>;
}
