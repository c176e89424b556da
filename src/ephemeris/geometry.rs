use super::observer::{EARTH_ECCENTRICITY_SQ, EARTH_EQUATORIAL_RADIUS_KM};

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

/// Azimuth in `[0, 2π)` (clockwise from north) and altitude in `[-π/2, π/2]`.
pub fn enu_to_az_alt(east: f64, north: f64, up: f64) -> (f64, f64) {
    let range = (east * east + north * north + up * up).sqrt();
    let azimuth = east.atan2(north).rem_euclid(std::f64::consts::TAU);
    let altitude = if range > 0.0 {
        (up / range).clamp(-1.0, 1.0).asin()
    } else {
        0.0
    };
    (azimuth, altitude)
}

/// Geodetic (WGS-84) latitude and longitude of an ECEF point, radians.
pub fn ecef_to_geodetic(pos: [f64; 3]) -> (f64, f64) {
    let lon = pos[1].atan2(pos[0]);
    let p = (pos[0] * pos[0] + pos[1] * pos[1]).sqrt();
    let mut lat = pos[2].atan2(p * (1.0 - EARTH_ECCENTRICITY_SQ));
    for _ in 0..5 {
        let sin_lat = lat.sin();
        let n = EARTH_EQUATORIAL_RADIUS_KM / (1.0 - EARTH_ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();
        lat = (pos[2] + n * EARTH_ECCENTRICITY_SQ * sin_lat).atan2(p);
    }
    (lat, lon)
}
