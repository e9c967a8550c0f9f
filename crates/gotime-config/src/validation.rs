//! Configuration validation

use crate::schema::{RawConfig, RawLocation, RawWatch};
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Watch #{index}: {message}")]
    WatchError { index: usize, message: String },

    #[error("Watch #{index}: coordinate ({lat}, {lng}) out of range")]
    InvalidCoordinate { index: usize, lat: f64, lng: f64 },

    #[error("Service config error: {0}")]
    ServiceError(String),
}

/// Validate a raw configuration, collecting every problem found
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_service(config, &mut errors);

    for (index, watch) in config.watches.iter().enumerate() {
        validate_watch(index, watch, &mut errors);
    }

    errors
}

fn validate_service(config: &RawConfig, errors: &mut Vec<ValidationError>) {
    let service = &config.service;

    let nonzero = [
        ("polling_interval_seconds", service.polling_interval_seconds),
        ("default_timeout_minutes", service.default_timeout_minutes),
        ("sweep_interval_seconds", service.sweep_interval_seconds),
    ];
    for (name, value) in nonzero {
        if value == Some(0) {
            errors.push(ValidationError::ServiceError(format!(
                "{} must be greater than zero",
                name
            )));
        }
    }

    if service.max_concurrent_sessions == Some(0) {
        errors.push(ValidationError::ServiceError(
            "max_concurrent_sessions must be greater than zero".into(),
        ));
    }
    if service.api_requests_per_minute == Some(0) {
        errors.push(ValidationError::ServiceError(
            "api_requests_per_minute must be greater than zero".into(),
        ));
    }
    if service.api_requests_per_day == Some(0) {
        errors.push(ValidationError::ServiceError(
            "api_requests_per_day must be greater than zero".into(),
        ));
    }
}

fn validate_watch(index: usize, watch: &RawWatch, errors: &mut Vec<ValidationError>) {
    if watch.target_seconds == 0 {
        errors.push(ValidationError::WatchError {
            index,
            message: "target_seconds must be greater than zero".into(),
        });
    }
    if watch.timeout_minutes == Some(0) {
        errors.push(ValidationError::WatchError {
            index,
            message: "timeout_minutes must be greater than zero".into(),
        });
    }
    if watch.polling_interval_seconds == Some(0) {
        errors.push(ValidationError::WatchError {
            index,
            message: "polling_interval_seconds must be greater than zero".into(),
        });
    }

    for (name, location) in [("origin", &watch.origin), ("destination", &watch.destination)] {
        match location {
            RawLocation::Address(address) => {
                if address.trim().is_empty() {
                    errors.push(ValidationError::WatchError {
                        index,
                        message: format!("{} address cannot be empty", name),
                    });
                }
            }
            RawLocation::Coords { lat, lng } => {
                if !(-90.0..=90.0).contains(lat) || !(-180.0..=180.0).contains(lng) {
                    errors.push(ValidationError::InvalidCoordinate {
                        index,
                        lat: *lat,
                        lng: *lng,
                    });
                }
            }
        }
    }
}
