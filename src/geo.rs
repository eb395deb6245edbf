//! Great-circle distance on a spherical Earth.
//!
//! Haversine formula with a mean Earth radius of 6371 km. Inputs are degrees;
//! no validation happens here, so NaN in means NaN out.

use serde::{Deserialize, Serialize};

const DEG: f64 = std::f64::consts::PI / 180.0;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// True when both components are finite and within the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        distance_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Haversine distance in kilometres between two points given in degrees.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1) * DEG;
    let d_lon = (lon2 - lon1) * DEG;

    let a = (d_lat / 2.0).sin().powi(2)
        + (lat1 * DEG).cos() * (lat2 * DEG).cos() * (d_lon / 2.0).sin().powi(2);
    // rounding can push antipodal points just above 1.0; f64::min would swallow NaN
    let root = if a > 1.0 { 1.0 } else { a.sqrt() };
    let c = 2.0 * root.asin();

    EARTH_RADIUS_KM * c
}

/// Format coordinates for human display: "23.5505°S, 46.6333°W".
pub fn format_coords(lat: f64, lon: f64) -> String {
    let ns = if lat >= 0.0 { 'N' } else { 'S' };
    let ew = if lon >= 0.0 { 'E' } else { 'W' };
    format!("{:.4}°{}, {:.4}°{}", lat.abs(), ns, lon.abs(), ew)
}
