//! Configuration parsing and validation for gotime
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Service settings (polling cadence, timeouts, API budgets)
//! - Watch definitions with address or coordinate endpoints
//! - Validation with clear error messages

mod schema;
mod settings;
mod validation;

pub use schema::*;
pub use settings::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Config::from_raw(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gotime_maps::LatLng;
    use std::time::Duration;

    #[test]
    fn parse_minimal_config() {
        let config = r#"
            config_version = 1
        "#;

        let config = parse_config(config).unwrap();
        assert!(config.watches.is_empty());
        assert_eq!(config.service.polling_interval, Duration::from_secs(300));
        assert_eq!(config.service.default_timeout, Duration::from_secs(7200));
        assert_eq!(config.service.max_concurrent_sessions, 10);
    }

    #[test]
    fn parse_full_config() {
        let config = r#"
            config_version = 1

            [service]
            google_maps_api_key = "test-key"
            polling_interval_seconds = 60
            default_timeout_minutes = 30
            max_concurrent_sessions = 4
            api_requests_per_minute = 10
            api_requests_per_day = 500
            sweep_interval_seconds = 5

            [[watches]]
            label = "commute"
            origin = { lat = 37.77, lng = -122.41 }
            destination = "1600 Amphitheatre Pkwy, Mountain View"
            target_seconds = 600
            timeout_minutes = 45
            polling_interval_seconds = 30
        "#;

        let config = parse_config(config).unwrap();
        assert_eq!(config.service.google_maps_api_key.as_deref(), Some("test-key"));
        assert_eq!(config.service.sweep_interval, Duration::from_secs(5));
        assert_eq!(config.service.api_requests_per_minute, 10);

        assert_eq!(config.watches.len(), 1);
        let watch = &config.watches[0];
        assert_eq!(watch.label.as_deref(), Some("commute"));
        assert!(matches!(
            watch.origin,
            WatchLocation::Coords(c) if c == LatLng::new(37.77, -122.41)
        ));
        assert!(matches!(watch.destination, WatchLocation::Address(_)));
        assert_eq!(watch.target, Duration::from_secs(600));
        assert_eq!(watch.timeout, Some(Duration::from_secs(45 * 60)));
        assert_eq!(watch.poll_interval, Some(Duration::from_secs(30)));
    }

    #[test]
    fn reject_wrong_version() {
        let config = r#"
            config_version = 99
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_watch() {
        let config = r#"
            config_version = 1

            [[watches]]
            origin = { lat = 37.77, lng = -122.41 }
            destination = { lat = 37.42, lng = -122.08 }
            target_seconds = 0
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }
}
