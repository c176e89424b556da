mod error;
mod predictor;
mod types;

pub use error::PredictError;
pub use predictor::PassPredictor;
pub use types::{LocalPass, LocalZone, Pass};
