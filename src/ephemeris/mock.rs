//! Scripted ephemeris for tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use super::{Ephemeris, EphemerisError, LookAngles, Observer, SatelliteTarget};
use crate::predict::Pass;

pub const ISS_TLE: &str = "ISS (ZARYA)
1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

pub fn degrees(azimuth: f64, altitude: f64) -> LookAngles {
    LookAngles {
        azimuth_rad: azimuth.to_radians(),
        altitude_rad: altitude.to_radians(),
        sub_latitude_rad: 0.0,
        sub_longitude_rad: 0.0,
    }
}

/// Replays look angles in order, repeating the last one once the script runs out.
///
/// `None` entries fail the computation. Passes are synthesized relative to the
/// observer clock: rise +10 min, max +15 min, set +20 min, until `last_rise`.
#[derive(Default)]
pub struct ScriptedEphemeris {
    looks: Mutex<VecDeque<Option<LookAngles>>>,
    last: Mutex<Option<LookAngles>>,
    last_rise: Option<DateTime<Utc>>,
    pass_requests: Mutex<Vec<DateTime<Utc>>>,
}

impl ScriptedEphemeris {
    pub fn new(script: impl IntoIterator<Item = Option<LookAngles>>) -> Self {
        Self {
            looks: Mutex::new(script.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn with_last_rise(mut self, last_rise: DateTime<Utc>) -> Self {
        self.last_rise = Some(last_rise);
        self
    }

    /// Observer clocks seen by `next_pass`, in call order.
    pub fn pass_requests(&self) -> Vec<DateTime<Utc>> {
        self.pass_requests.lock().unwrap().clone()
    }
}

impl Ephemeris for ScriptedEphemeris {
    fn look_at(
        &self,
        _target: &SatelliteTarget,
        _observer: &Observer,
    ) -> Result<LookAngles, EphemerisError> {
        let mut last = self.last.lock().unwrap();
        let next = match self.looks.lock().unwrap().pop_front() {
            Some(entry) => entry,
            None => *last,
        };
        *last = next;
        next.ok_or_else(|| EphemerisError::Propagation("scripted failure".to_string()))
    }

    fn next_pass(
        &self,
        _target: &SatelliteTarget,
        observer: &Observer,
    ) -> Result<Option<Pass>, EphemerisError> {
        self.pass_requests.lock().unwrap().push(observer.date);

        let rise_time = observer.date + Duration::minutes(10);
        if self.last_rise.is_some_and(|last| rise_time > last) {
            return Ok(None);
        }

        Ok(Some(Pass {
            rise_time,
            rise_azimuth: 0.5,
            max_time: observer.date + Duration::minutes(15),
            max_altitude: 1.0,
            set_time: observer.date + Duration::minutes(20),
            set_azimuth: 4.0,
        }))
    }
}

/// Each computation returns `azimuth == altitude == n` degrees for the n-th call.
#[derive(Default)]
pub struct CountingEphemeris {
    calls: AtomicU64,
}

impl Ephemeris for CountingEphemeris {
    fn look_at(
        &self,
        _target: &SatelliteTarget,
        _observer: &Observer,
    ) -> Result<LookAngles, EphemerisError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let deg = (n % 90) as f64;
        Ok(degrees(deg, deg))
    }

    fn next_pass(
        &self,
        _target: &SatelliteTarget,
        _observer: &Observer,
    ) -> Result<Option<Pass>, EphemerisError> {
        Ok(None)
    }
}
