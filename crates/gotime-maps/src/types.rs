//! Coordinate and departure types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A geographic point in WGS84 latitude/longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are within valid WGS84 ranges
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for LatLng {
    /// Waypoint format accepted by the Maps web services: `lat,lng`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// When a travel-time estimate should be computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Departure {
    /// Depart immediately (live traffic)
    Now,
    /// Depart at a specific instant
    At(DateTime<Utc>),
}

impl Departure {
    /// Value for the `departure_time` query parameter
    pub fn as_query_param(&self) -> String {
        match self {
            Departure::Now => "now".to_string(),
            Departure::At(when) => when.timestamp().to_string(),
        }
    }
}
