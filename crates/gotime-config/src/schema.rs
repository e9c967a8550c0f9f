//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Routes to watch at startup
    #[serde(default)]
    pub watches: Vec<RawWatch>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Google Maps API key (the GOOGLE_MAPS_API_KEY env var overrides this)
    pub google_maps_api_key: Option<String>,

    /// Default polling cadence for watches that don't set their own
    pub polling_interval_seconds: Option<u64>,

    /// Default watch timeout
    pub default_timeout_minutes: Option<u64>,

    /// Maximum number of simultaneously active watches
    pub max_concurrent_sessions: Option<usize>,

    /// External API budget: requests per trailing minute
    pub api_requests_per_minute: Option<u32>,

    /// External API budget: requests per rolling day
    pub api_requests_per_day: Option<u32>,

    /// Cadence of the engine's sweep loop
    pub sweep_interval_seconds: Option<u64>,
}

/// Raw watch definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawWatch {
    /// Display label for logs and notifications
    pub label: Option<String>,

    /// Start point
    pub origin: RawLocation,

    /// End point
    pub destination: RawLocation,

    /// Notify once travel time drops to this many seconds
    pub target_seconds: u64,

    /// Give up after this many minutes (default from service settings)
    pub timeout_minutes: Option<u64>,

    /// Poll cadence override for this watch
    pub polling_interval_seconds: Option<u64>,
}

/// A location: either an address string to geocode, or explicit coordinates
///
/// ```toml
/// origin = "1600 Amphitheatre Pkwy, Mountain View"
/// destination = { lat = 37.77, lng = -122.41 }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawLocation {
    Address(String),
    Coords { lat: f64, lng: f64 },
}
