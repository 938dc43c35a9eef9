//! Great-circle distance on a spherical Earth.

use serde::{Deserialize, Serialize};

use crate::EARTH_RADIUS_KM;

/// A point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Finite and inside [-90, 90] x [-180, 180].
    pub fn is_valid(&self) -> bool {
        valid_coords(self.lat, self.lon)
    }

    /// Returns the point only when it can take part in distance ranking.
    pub fn validated(self) -> Option<Self> {
        self.is_valid().then_some(self)
    }
}

pub fn valid_coords(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

/// Haversine distance in kilometres.
///
/// NaN inputs propagate; callers validate coordinates first.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // rounding can push h a hair past 1 for antipodal points
    2.0 * EARTH_RADIUS_KM * h.min(1.0).sqrt().asin()
}

/// Round to two decimal places for presentation.
pub fn round2(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}
