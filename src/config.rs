use chrono::FixedOffset;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::ephemeris::Observer;
use crate::motor::MotorConfig;
use crate::predict::LocalZone;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid observer coordinates: {0}")]
    InvalidCoordinates(String),
    #[error("invalid UTC offset: {0}")]
    InvalidUtcOffset(String),
    #[error("search window {0:?} is longer than the {max} day limit", max = MAX_SEARCH_WINDOW_DAYS)]
    InvalidSearchWindow(Duration),
}

pub const MAX_SEARCH_WINDOW_DAYS: i64 = 366;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub observer: ObserverConfig,
    pub tle: PathBuf,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub motors: Option<MotorsConfig>,
    #[serde(default)]
    pub prediction: PredictionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObserverConfig {
    pub coordinates: String,
    #[serde(default)]
    pub elevation_m: f64,
    #[serde(default)]
    pub horizon_deg: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_interval", deserialize_with = "deserialize_duration")]
    pub interval: Duration,
    /// Defaults to `interval`.
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub motor_interval: Option<Duration>,
    /// Hold the mount still while the target is below the horizon.
    #[serde(default = "default_true")]
    pub require_observable: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            motor_interval: None,
            require_observable: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotorsConfig {
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_write_timeout", deserialize_with = "deserialize_duration")]
    pub write_timeout: Duration,
    #[serde(default)]
    pub azimuth: MotorConfig,
    #[serde(default)]
    pub altitude: MotorConfig,
}

impl Default for MotorsConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: default_baud_rate(),
            write_timeout: default_write_timeout(),
            azimuth: MotorConfig::default(),
            altitude: MotorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionConfig {
    #[serde(default = "default_search_window", deserialize_with = "deserialize_duration")]
    pub search_window: Duration,
    /// e.g. `"-05:00"`; the host's zone when absent.
    #[serde(default)]
    pub utc_offset: Option<String>,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            search_window: default_search_window(),
            utc_offset: None,
        }
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_true() -> bool {
    true
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_write_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_search_window() -> Duration {
    Duration::from_secs(7 * 24 * 3600)
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.prediction.search_window()?;
        Ok(config)
    }

    pub fn observer(&self) -> Result<Observer, ConfigError> {
        Observer::from_coordinates(&self.observer.coordinates, Some(self.observer.elevation_m))
            .map(|o| o.with_horizon(self.observer.horizon_deg))
            .ok_or_else(|| ConfigError::InvalidCoordinates(self.observer.coordinates.clone()))
    }

    pub fn motor_interval(&self) -> Duration {
        self.tracking.motor_interval.unwrap_or(self.tracking.interval)
    }
}

impl PredictionConfig {
    pub fn zone(&self) -> Result<LocalZone, ConfigError> {
        match &self.utc_offset {
            None => Ok(LocalZone::System),
            Some(s) => s
                .trim()
                .parse::<FixedOffset>()
                .map(LocalZone::Fixed)
                .map_err(|_| ConfigError::InvalidUtcOffset(s.clone())),
        }
    }

    pub fn search_window(&self) -> Result<chrono::Duration, ConfigError> {
        chrono::Duration::from_std(self.search_window)
            .ok()
            .filter(|window| *window <= chrono::Duration::days(MAX_SEARCH_WINDOW_DAYS))
            .ok_or(ConfigError::InvalidSearchWindow(self.search_window))
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

fn deserialize_opt_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom))
        .transpose()
}
