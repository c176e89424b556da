mod error;
pub mod oracle;
mod tracker;
mod types;

pub use error::TrackerError;
pub use tracker::Tracker;
pub use types::{Fix, Position, TrackingState};
