use chrono::{DateTime, Utc};

pub const EARTH_ROTATION_RAD_S: f64 = 7.292_115e-5;

// WGS-84
pub const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.137;
pub const EARTH_ECCENTRICITY_SQ: f64 = 0.00669437999014;

/// Where the mount stands, and the instant it is looking at the sky.
///
/// `date` is the observer's clock. The position loop owns the only copy whose
/// clock follows wall time; predictions take their own copy via [`Observer::at`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub elevation_m: f64,
    pub horizon_deg: f64,
    pub epoch: DateTime<Utc>,
    pub date: DateTime<Utc>,
}

impl Observer {
    pub fn new(latitude_deg: f64, longitude_deg: f64, elevation_m: f64) -> Self {
        let now = Utc::now();
        Self {
            latitude_deg,
            longitude_deg,
            elevation_m,
            horizon_deg: 0.0,
            epoch: now,
            date: now,
        }
    }

    /// Parses `"lat,lon"` (positive north and east).
    pub fn from_coordinates(coordinates: &str, elevation_m: Option<f64>) -> Option<Self> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return None;
        }
        let lat: f64 = parts[0].parse().ok()?;
        let lon: f64 = parts[1].parse().ok()?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(Self::new(lat, lon, elevation_m.unwrap_or(0.0)))
    }

    pub fn with_horizon(mut self, horizon_deg: f64) -> Self {
        self.horizon_deg = horizon_deg;
        self
    }

    /// Copy of this observer with its clock set to `date`. The receiver is untouched.
    pub fn at(&self, date: DateTime<Utc>) -> Self {
        Self { date, ..*self }
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let n = EARTH_EQUATORIAL_RADIUS_KM / (1.0 - EARTH_ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();
        let alt_km = self.elevation_m / 1000.0;
        [
            (n + alt_km) * cos_lat * lon.cos(),
            (n + alt_km) * cos_lat * lon.sin(),
            (n * (1.0 - EARTH_ECCENTRICITY_SQ) + alt_km) * sin_lat,
        ]
    }
}
