use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::ephemeris::{Ephemeris, Observer, SatelliteTarget};
use crate::predict::error::PredictError;
use crate::predict::types::{LocalPass, LocalZone, Pass};

/// Skips past a pass that is already in progress at the start time.
const START_MARGIN: Duration = Duration::minutes(1);

/// Pass prediction over private copies of the observer and the element set.
///
/// Built from a snapshot of the tracker's configuration, it never touches the
/// live tracking state and can run concurrently with the tracking loops.
pub struct PassPredictor {
    observer: Observer,
    target: SatelliteTarget,
    ephemeris: Arc<dyn Ephemeris>,
    zone: LocalZone,
}

impl PassPredictor {
    pub fn new(
        observer: Observer,
        target: SatelliteTarget,
        ephemeris: Arc<dyn Ephemeris>,
        zone: LocalZone,
    ) -> Self {
        Self {
            observer,
            target,
            ephemeris,
            zone,
        }
    }

    /// Next pass after `start` (default: now), in UTC and radians.
    pub fn next_pass(&self, start: Option<DateTime<Utc>>) -> Result<Pass, PredictError> {
        let start = start.unwrap_or_else(Utc::now);
        let observer = self.observer.at(start + START_MARGIN);
        let target = self.target.clone();

        self.ephemeris
            .next_pass(&target, &observer)?
            .ok_or(PredictError::NoPass { after: start })
    }

    /// Same as [`next_pass`](Self::next_pass), converted to local time and degrees.
    pub fn next_pass_local(&self, start: Option<DateTime<Utc>>) -> Result<LocalPass, PredictError> {
        Ok(self.next_pass(start)?.to_local(self.zone))
    }

    /// Up to `n` consecutive passes, each search starting at the previous set time.
    ///
    /// Stops early, without error, once no further pass is found.
    pub fn next_passes(
        &self,
        n: usize,
        start: Option<DateTime<Utc>>,
    ) -> Result<Vec<Pass>, PredictError> {
        let mut passes = Vec::with_capacity(n);
        let mut start = start;

        for _ in 0..n {
            match self.next_pass(start) {
                Ok(pass) => {
                    start = Some(pass.set_time);
                    passes.push(pass);
                }
                Err(PredictError::NoPass { after }) => {
                    log::debug!(
                        "No pass for {} after {}, returning {} of {}",
                        self.target.id(),
                        after,
                        passes.len(),
                        n
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(passes)
    }

    pub fn next_passes_local(
        &self,
        n: usize,
        start: Option<DateTime<Utc>>,
    ) -> Result<Vec<LocalPass>, PredictError> {
        Ok(self
            .next_passes(n, start)?
            .iter()
            .map(|p| p.to_local(self.zone))
            .collect())
    }
}
