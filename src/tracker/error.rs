use thiserror::Error;

use crate::motor::MotorError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{0} loop already running")]
    AlreadyRunning(&'static str),
    #[error("no servo controller connected")]
    NotConnected,
    #[error("motor error: {0}")]
    Motor(#[from] MotorError),
}
