//! Validated settings structures

use crate::schema::{RawConfig, RawLocation, RawWatch};
use gotime_maps::LatLng;
use std::time::Duration;

/// Validated configuration ready for use by the daemon and engine
#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceSettings,
    pub watches: Vec<WatchConfig>,
}

impl Config {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let service = ServiceSettings::from_raw(&raw.service);
        let watches = raw.watches.into_iter().map(WatchConfig::from_raw).collect();

        Self { service, watches }
    }
}

/// Service-level settings with defaults applied
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub google_maps_api_key: Option<String>,
    pub polling_interval: Duration,
    pub default_timeout: Duration,
    pub max_concurrent_sessions: usize,
    pub api_requests_per_minute: u32,
    pub api_requests_per_day: u32,
    pub sweep_interval: Duration,
}

impl ServiceSettings {
    fn from_raw(raw: &crate::schema::RawServiceConfig) -> Self {
        let defaults = Self::default();
        Self {
            google_maps_api_key: raw.google_maps_api_key.clone(),
            polling_interval: raw
                .polling_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.polling_interval),
            default_timeout: raw
                .default_timeout_minutes
                .map(|m| Duration::from_secs(m * 60))
                .unwrap_or(defaults.default_timeout),
            max_concurrent_sessions: raw
                .max_concurrent_sessions
                .unwrap_or(defaults.max_concurrent_sessions),
            api_requests_per_minute: raw
                .api_requests_per_minute
                .unwrap_or(defaults.api_requests_per_minute),
            api_requests_per_day: raw
                .api_requests_per_day
                .unwrap_or(defaults.api_requests_per_day),
            sweep_interval: raw
                .sweep_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            google_maps_api_key: None,
            polling_interval: Duration::from_secs(300),
            default_timeout: Duration::from_secs(120 * 60),
            max_concurrent_sessions: 10,
            api_requests_per_minute: 60,
            api_requests_per_day: 5000,
            sweep_interval: Duration::from_secs(10),
        }
    }
}

/// A route to watch, as declared in configuration
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub label: Option<String>,
    pub origin: WatchLocation,
    pub destination: WatchLocation,
    pub target: Duration,
    pub timeout: Option<Duration>,
    pub poll_interval: Option<Duration>,
}

impl WatchConfig {
    fn from_raw(raw: RawWatch) -> Self {
        Self {
            label: raw.label,
            origin: WatchLocation::from_raw(raw.origin),
            destination: WatchLocation::from_raw(raw.destination),
            target: Duration::from_secs(raw.target_seconds),
            timeout: raw.timeout_minutes.map(|m| Duration::from_secs(m * 60)),
            poll_interval: raw.polling_interval_seconds.map(Duration::from_secs),
        }
    }
}

/// Watch endpoint: already-resolved coordinates or an address to geocode
#[derive(Debug, Clone)]
pub enum WatchLocation {
    Address(String),
    Coords(LatLng),
}

impl WatchLocation {
    fn from_raw(raw: RawLocation) -> Self {
        match raw {
            RawLocation::Address(address) => Self::Address(address),
            RawLocation::Coords { lat, lng } => Self::Coords(LatLng::new(lat, lng)),
        }
    }
}
