use std::fs;
use std::path::Path;

use sgp4::{Constants, Elements};

use super::error::EphemerisError;

/// The satellite being followed, kept as the raw element set it was loaded from.
///
/// Every consumer gets its own freshly parsed [`Elements`], so nothing that
/// propagates the orbit is ever shared between the live loops and a prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteTarget {
    id: String,
    name: Option<String>,
    line1: String,
    line2: String,
}

impl SatelliteTarget {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EphemerisError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Accepts a 3-line (name, line 1, line 2) or bare 2-line element set.
    pub fn parse(tle: &str) -> Result<Self, EphemerisError> {
        let (name, line1, line2) = parse_tle_lines(tle)?;
        let elements = Elements::from_tle(name.clone(), line1.as_bytes(), line2.as_bytes())?;

        let id = match name.as_deref().map(sanitize) {
            Some(id) if !id.is_empty() => id,
            _ => elements.norad_id.to_string(),
        };

        Ok(Self {
            id,
            name,
            line1,
            line2,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Parses the stored lines into a new, unshared elements handle.
    pub fn elements(&self) -> Result<Elements, EphemerisError> {
        Ok(Elements::from_tle(
            self.name.clone(),
            self.line1.as_bytes(),
            self.line2.as_bytes(),
        )?)
    }

    pub fn propagator(&self) -> Result<(Elements, Constants), EphemerisError> {
        let elements = self.elements()?;
        let constants = Constants::from_elements(&elements)?;
        Ok((elements, constants))
    }
}

fn parse_tle_lines(tle: &str) -> Result<(Option<String>, String, String), EphemerisError> {
    let lines: Vec<String> = tle
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();

    match lines.len() {
        2 => Ok((None, lines[0].clone(), lines[1].clone())),
        3 => Ok((Some(lines[0].clone()), lines[1].clone(), lines[2].clone())),
        _ => Err(EphemerisError::InvalidTleFormat),
    }
}

pub fn sanitize(name: &str) -> String {
    name.chars().filter(|c| c.is_alphanumeric()).collect()
}
