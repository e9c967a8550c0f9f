//! Error types for gotime

use thiserror::Error;

use crate::SessionId;

/// Core error type for gotime operations
#[derive(Debug, Error)]
pub enum GotimeError {
    #[error("Maximum concurrent sessions reached ({active}/{max})")]
    CapacityExceeded { active: usize, max: usize },

    #[error("Session already registered: {0}")]
    DuplicateSession(SessionId),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Travel-time source error: {0}")]
    SourceError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GotimeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self::SourceError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, GotimeError>;
