//! Errors from travel-time source operations

use thiserror::Error;

/// Errors a travel-time source can produce.
///
/// "No route found" is not an error; sources report it as `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Rate, timeout, or transport-level failure. Retryable at a higher
    /// layer; a monitored session stays active across these.
    #[error("Transient API error: {0}")]
    Transient(String),

    /// The payload could not be parsed. Callers treat this like a missing
    /// result, not a session failure.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The API rejected the request outright (denied key, invalid request).
    /// Not retryable; terminates the session that hit it.
    #[error("API error: {0}")]
    Api(String),
}

impl SourceError {
    /// Whether a poll hitting this error should leave its session active
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SourceError::Api(_))
    }
}

pub type SourceResult<T> = Result<T, SourceError>;
