mod config;
mod ephemeris;
mod motor;
mod predict;
mod tracker;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::ephemeris::{EphemerisError, SatelliteTarget, Sgp4Ephemeris};
use crate::motor::{MotorController, MotorError};
use crate::predict::PredictError;
use crate::tracker::{Fix, Tracker, TrackerError};

#[derive(Parser)]
#[command(name = "sat-track")]
#[command(about = "Satellite tracking and servo mount control")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and the TLE it points to
    Validate { config: String },
    /// Print the satellite's position at every update
    Position { config: String },
    /// Predict upcoming passes, one JSON record per line
    Passes {
        config: String,
        /// Number of passes
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
        /// Search start (RFC3339), defaults to now
        #[arg(long)]
        start: Option<String>,
        /// Report UTC times and radians instead of local times and degrees
        #[arg(long)]
        native: bool,
    },
    /// Compute positions and steer the servos until interrupted
    Track { config: String },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("tle: {0}")]
    Ephemeris(#[from] EphemerisError),
    #[error("prediction: {0}")]
    Predict(#[from] PredictError),
    #[error("tracker: {0}")]
    Tracker(#[from] TrackerError),
    #[error("servos: {0}")]
    Motor(#[from] MotorError),
    #[error("invalid start time: {0}")]
    Start(#[from] chrono::ParseError),
    #[error("no servo configuration (`motors`) in config")]
    NoMotors,
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Position { config } => position(&config).await,
        Commands::Passes {
            config,
            count,
            start,
            native,
        } => passes(&config, count, start.as_deref(), native),
        Commands::Track { config } => track(&config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load(path: &str) -> Result<(Config, Tracker), CliError> {
    let config = Config::from_file(path)?;
    let observer = config.observer()?;
    let target = SatelliteTarget::from_file(&config.tle)?;
    let ephemeris = Arc::new(Sgp4Ephemeris::new(config.prediction.search_window()?));
    let tracker = Tracker::new(observer, target, ephemeris)
        .require_observable(config.tracking.require_observable);
    Ok((config, tracker))
}

fn validate(path: &str) -> Result<(), CliError> {
    let (config, tracker) = load(path)?;
    config.prediction.zone()?;
    let observer = tracker.observer();

    println!("Configuration is valid");
    let target = tracker.target();
    println!("  target: {} ({})", target.id(), target.name().unwrap_or("unnamed"));
    println!(
        "  observer: {:.4}, {:.4} at {} m, horizon {}°, epoch {}",
        observer.latitude_deg,
        observer.longitude_deg,
        observer.elevation_m,
        observer.horizon_deg,
        observer.epoch
    );
    match &config.motors {
        Some(motors) => println!("  servos: {} at {} baud", motors.port, motors.baud_rate),
        None => println!("  servos: none"),
    }
    Ok(())
}

fn passes(path: &str, count: usize, start: Option<&str>, native: bool) -> Result<(), CliError> {
    let (config, tracker) = load(path)?;
    let start = start
        .map(|s| DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)))
        .transpose()?;
    let predictor = tracker.predictor(config.prediction.zone()?);

    let found = if native {
        let passes = predictor.next_passes(count, start)?;
        for pass in &passes {
            println!("{}", serde_json::to_string(pass)?);
        }
        passes.len()
    } else {
        let passes = predictor.next_passes_local(count, start)?;
        for pass in &passes {
            println!("{}", serde_json::to_string(pass)?);
        }
        passes.len()
    };

    if found < count {
        log::warn!("Only {} of {} passes found in the search window", found, count);
    }
    Ok(())
}

async fn position(path: &str) -> Result<(), CliError> {
    let (config, mut tracker) = load(path)?;
    let mut updates = tracker.subscribe();
    tracker.begin_computing(config.tracking.interval)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                match state.fix {
                    Fix::Active(p) => println!(
                        "#{} Azimuth: {:.2} Altitude: {:.2} Lat: {:.2} Long: {:.2}",
                        state.cycle, p.azimuth_deg, p.altitude_deg, p.sub_latitude_deg, p.sub_longitude_deg
                    ),
                    Fix::Inactive(reason) => println!("#{} inactive: {}", state.cycle, reason),
                }
            }
        }
    }

    tracker.stop().await;
    Ok(())
}

async fn track(path: &str) -> Result<(), CliError> {
    let (config, mut tracker) = load(path)?;
    let motors = config.motors.as_ref().ok_or(CliError::NoMotors)?;

    let controller = MotorController::open(motors)?;
    tracker.connect_servos(controller)?;

    match tracker.predictor(config.prediction.zone()?).next_pass_local(None) {
        Ok(pass) => log::info!(
            "Next pass of {}: rise {} at {:.0}°, max {:.0}° at {}, set {}",
            tracker.target().id(),
            pass.rise_time,
            pass.rise_azimuth,
            pass.max_altitude,
            pass.max_time,
            pass.set_time
        ),
        Err(e) => log::warn!("{}", e),
    }

    let mut updates = tracker.subscribe();
    tracker.begin_computing(config.tracking.interval)?;
    tracker.begin_tracking(Some(config.motor_interval()))?;

    let mut reachable = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                updates.borrow_and_update();
                let now = (tracker.is_observable(), tracker.is_trackable()?);
                if reachable != Some(now) {
                    log::info!("Target observable: {}, within mount range: {}", now.0, now.1);
                    reachable = Some(now);
                }
            }
        }
    }

    log::info!("Interrupted, stopping");
    tracker.stop().await;
    Ok(())
}
