use thiserror::Error;

#[derive(Debug, Error)]
pub enum EphemerisError {
    #[error("invalid tle format")]
    InvalidTleFormat,
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("invalid tle: {0}")]
    InvalidTle(#[from] sgp4::TleError),
    #[error("elements error: {0}")]
    Elements(#[from] sgp4::ElementsError),
    #[error("propagation error: {0}")]
    Propagation(String),
}

impl From<sgp4::Error> for EphemerisError {
    fn from(err: sgp4::Error) -> Self {
        EphemerisError::Propagation(err.to_string())
    }
}
