use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::ephemeris::EphemerisError;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("no pass found after {after}")]
    NoPass { after: DateTime<Utc> },
    #[error("ephemeris error: {0}")]
    Ephemeris(#[from] EphemerisError),
}
