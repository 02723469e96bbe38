//! Tropical cyclone event records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic location in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.lat, self.lon)
    }
}

/// A TC event: identifier plus center location
///
/// Identifiers are basin-relative strings such as `"09L"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcEvent {
    pub id: String,
    /// Center latitude (degrees north)
    pub lat: f64,
    /// Center longitude (degrees east)
    pub lon: f64,
}

impl TcEvent {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
        }
    }

    #[inline]
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}
