//! Coordinate model shared by the map, weather and geometry modules

use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

use crate::{Result, TripSkyError};

/// A longitude/latitude pair in decimal degrees (GCJ-02 as returned by AMap).
///
/// Serialized as a `[lng, lat]` array, the same shape GeoJSON and the map
/// front end use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    /// Longitude in decimal degrees
    pub lng: f64,
    /// Latitude in decimal degrees
    pub lat: f64,
}

impl LngLat {
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Parse a `"lng,lat"` pair. Exactly two finite numbers are accepted.
    #[must_use]
    pub fn parse_pair(text: &str) -> Option<Self> {
        let mut parts = text.split(',');
        let lng = parts.next()?.trim().parse::<f64>().ok()?;
        let lat = parts.next()?.trim().parse::<f64>().ok()?;
        if parts.next().is_some() || !lng.is_finite() || !lat.is_finite() {
            return None;
        }
        Some(Self { lng, lat })
    }

    /// Parse an AMap polyline string (`"lng,lat;lng,lat;..."`).
    pub fn parse_polyline(text: &str) -> Result<Vec<Self>> {
        text.split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| {
                Self::parse_pair(p)
                    .ok_or_else(|| TripSkyError::parse(format!("Invalid polyline point '{p}'")))
            })
            .collect()
    }

    /// Coordinate parameter for AMap requests
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("{:.6},{:.6}", self.lng, self.lat)
    }

    /// Great-circle distance to another point in meters
    #[must_use]
    pub fn distance_to(&self, other: &LngLat) -> f64 {
        Haversine.distance(Point::from(*self), Point::from(*other))
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(p: LngLat) -> Self {
        [p.lng, p.lat]
    }
}

impl From<LngLat> for Point<f64> {
    fn from(p: LngLat) -> Self {
        Point::new(p.lng, p.lat)
    }
}

impl From<Point<f64>> for LngLat {
    fn from(p: Point<f64>) -> Self {
        Self::new(p.x(), p.y())
    }
}

impl std::fmt::Display for LngLat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.lng, self.lat)
    }
}
