use chrono::{DateTime, Duration, Utc};
use sgp4::{Constants, Elements};

use super::error::EphemerisError;
use super::geometry::{ecef_to_enu, ecef_to_geodetic, enu_to_az_alt, teme_to_ecef_position};
use super::observer::Observer;
use super::target::SatelliteTarget;
use super::{Ephemeris, LookAngles};
use crate::predict::Pass;

const COARSE_STEP_SECONDS: i64 = 60; // 1 minute for initial scan
const FINE_STEP_SECONDS: i64 = 1; // 1 second for refinement
const DEFAULT_SEARCH_WINDOW_DAYS: i64 = 7;

/// SGP4/SDP4 propagation of a TLE, looked at from an [`Observer`].
#[derive(Debug, Clone, Copy)]
pub struct Sgp4Ephemeris {
    search_window: Duration,
}

impl Default for Sgp4Ephemeris {
    fn default() -> Self {
        Self {
            search_window: Duration::days(DEFAULT_SEARCH_WINDOW_DAYS),
        }
    }
}

impl Sgp4Ephemeris {
    pub fn new(search_window: Duration) -> Self {
        Self { search_window }
    }
}

impl Ephemeris for Sgp4Ephemeris {
    fn look_at(
        &self,
        target: &SatelliteTarget,
        observer: &Observer,
    ) -> Result<LookAngles, EphemerisError> {
        let (elements, constants) = target.propagator()?;
        Propagator {
            elements: &elements,
            constants: &constants,
            observer,
        }
        .look(observer.date)
    }

    fn next_pass(
        &self,
        target: &SatelliteTarget,
        observer: &Observer,
    ) -> Result<Option<Pass>, EphemerisError> {
        let (elements, constants) = target.propagator()?;
        Propagator {
            elements: &elements,
            constants: &constants,
            observer,
        }
        .find_next_pass(
            observer
                .date
                .checked_add_signed(self.search_window)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        )
    }
}

struct Propagator<'a> {
    elements: &'a Elements,
    constants: &'a Constants,
    observer: &'a Observer,
}

impl Propagator<'_> {
    fn look(&self, timestamp: DateTime<Utc>) -> Result<LookAngles, EphemerisError> {
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
            .map_err(|e| EphemerisError::Propagation(e.to_string()))?;

        let prediction = self.constants.propagate(minutes)?;

        let sidereal = sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(
            &timestamp.naive_utc(),
        ));

        let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);
        let sta_ecef = self.observer.position_ecef_km();
        let dr = [
            sat_ecef[0] - sta_ecef[0],
            sat_ecef[1] - sta_ecef[1],
            sat_ecef[2] - sta_ecef[2],
        ];

        let (east, north, up) = ecef_to_enu(dr, self.observer.lat_rad(), self.observer.lon_rad());
        let (azimuth_rad, altitude_rad) = enu_to_az_alt(east, north, up);
        let (sub_latitude_rad, sub_longitude_rad) = ecef_to_geodetic(sat_ecef);

        if !(azimuth_rad.is_finite() && altitude_rad.is_finite()) {
            return Err(EphemerisError::Propagation(
                "non-finite look angles".to_string(),
            ));
        }

        Ok(LookAngles {
            azimuth_rad,
            altitude_rad,
            sub_latitude_rad,
            sub_longitude_rad,
        })
    }

    fn is_up(&self, timestamp: DateTime<Utc>) -> Result<bool, EphemerisError> {
        let horizon = self.observer.horizon_deg.to_radians();
        Ok(self.look(timestamp)?.altitude_rad >= horizon)
    }

    /// Scans forward from the observer clock for the next complete pass.
    ///
    /// A pass already in progress at the start is skipped, and so is a pass
    /// whose set falls after `end`.
    fn find_next_pass(&self, end: DateTime<Utc>) -> Result<Option<Pass>, EphemerisError> {
        let step = Duration::seconds(COARSE_STEP_SECONDS);
        let mut cursor = self.observer.date;

        while self.is_up(cursor)? {
            cursor += step;
            if cursor > end {
                return Ok(None);
            }
        }

        let mut below = cursor;
        let first_up = loop {
            cursor += step;
            if cursor > end {
                return Ok(None);
            }
            if self.is_up(cursor)? {
                break cursor;
            }
            below = cursor;
        };
        let rise_time = self.refine_crossing(below, first_up, true)?;

        let mut best_time = first_up;
        let mut best_alt = self.look(first_up)?.altitude_rad;
        let mut last_up = first_up;
        let first_down = loop {
            cursor += step;
            if cursor > end {
                return Ok(None);
            }
            let alt = self.look(cursor)?.altitude_rad;
            if alt < self.observer.horizon_deg.to_radians() {
                break cursor;
            }
            if alt > best_alt {
                best_alt = alt;
                best_time = cursor;
            }
            last_up = cursor;
        };
        let set_time = self.refine_crossing(last_up, first_down, false)?;

        let (max_time, max_altitude) = self.refine_max(best_time, rise_time, set_time)?;

        Ok(Some(Pass {
            rise_time,
            rise_azimuth: self.look(rise_time)?.azimuth_rad,
            max_time,
            max_altitude,
            set_time,
            set_azimuth: self.look(set_time)?.azimuth_rad,
        }))
    }

    /// Binary search for the horizon crossing between `before` and `after`.
    fn refine_crossing(
        &self,
        before: DateTime<Utc>,
        after: DateTime<Utc>,
        rising: bool,
    ) -> Result<DateTime<Utc>, EphemerisError> {
        let mut low = before;
        let mut high = after;

        while (high - low).num_seconds() > FINE_STEP_SECONDS {
            let mid = low + (high - low) / 2;
            if self.is_up(mid)? == rising {
                high = mid;
            } else {
                low = mid;
            }
        }

        Ok(high)
    }

    /// One-second scan around the best coarse sample, kept strictly inside (rise, set).
    fn refine_max(
        &self,
        coarse: DateTime<Utc>,
        rise: DateTime<Utc>,
        set: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, f64), EphemerisError> {
        let fine = Duration::seconds(FINE_STEP_SECONDS);
        let coarse_step = Duration::seconds(COARSE_STEP_SECONDS);
        let low = (coarse - coarse_step).max(rise + fine);
        let high = (coarse + coarse_step).min(set - fine);

        if low > high {
            let mid = rise + (set - rise) / 2;
            return Ok((mid, self.look(mid)?.altitude_rad));
        }

        let mut best_time = coarse.clamp(low, high);
        let mut best_alt = self.look(best_time)?.altitude_rad;
        let mut cursor = low;
        while cursor <= high {
            let alt = self.look(cursor)?.altitude_rad;
            if alt > best_alt {
                best_alt = alt;
                best_time = cursor;
            }
            cursor += fine;
        }

        Ok((best_time, best_alt))
    }
}
