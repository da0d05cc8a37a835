//! Error types for fq-gm
//!
//! Internal errors keep their full detail for logging; [`Error::to_response`]
//! produces the structured form handed across the service boundary, which
//! never carries storage internals.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Main error type for the gamification store
#[derive(Error, Debug)]
pub enum Error {
    /// Mission absent from the catalog or deactivated
    #[error("Mission not found: {0}")]
    MissionNotFound(String),

    /// Other resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Progress percentage outside [0, 100]
    #[error("Progress {0} is outside the range 0..=100")]
    InvalidRange(i64),

    /// Invalid request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Catalog, progress or completion store unreachable or failing
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    /// Configuration / settings errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using fq-gm Error
pub type Result<T> = std::result::Result<T, Error>;

impl From<fq_common::Error> for Error {
    fn from(err: fq_common::Error) -> Self {
        match err {
            fq_common::Error::Database(e) => Error::StorageUnavailable(e),
            fq_common::Error::Io(e) => Error::Internal(e.to_string()),
            fq_common::Error::Config(msg) => Error::Config(msg),
            fq_common::Error::NotFound(msg) => Error::NotFound(msg),
            fq_common::Error::InvalidInput(msg) => Error::InvalidInput(msg),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(format!("JSON: {}", err))
    }
}

/// Structured error handed to callers of the service boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code
    pub error: String,
    /// Human-readable message
    pub message: String,
}

impl Error {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Error::MissionNotFound(_) => "mission_not_found",
            Error::NotFound(_) => "not_found",
            Error::InvalidRange(_) => "invalid_range",
            Error::InvalidInput(_) => "invalid_input",
            Error::StorageUnavailable(_) => "storage_unavailable",
            Error::Config(_) | Error::Internal(_) => "internal_error",
        }
    }

    /// Convert into the public error shape
    ///
    /// Caller-correctable errors keep their message. Storage and internal
    /// faults are logged here and replaced by a generic message.
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            Error::MissionNotFound(_)
            | Error::NotFound(_)
            | Error::InvalidRange(_)
            | Error::InvalidInput(_) => self.to_string(),
            Error::StorageUnavailable(_) => {
                error!("Storage failure: {}", self);
                "Storage is temporarily unavailable".to_string()
            }
            Error::Config(_) | Error::Internal(_) => {
                error!("Internal failure: {}", self);
                "Internal error".to_string()
            }
        };

        ErrorResponse {
            error: self.code().to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_keeps_message() {
        let response = Error::MissionNotFound("mission_042".to_string()).to_response();
        assert_eq!(response.error, "mission_not_found");
        assert!(response.message.contains("mission_042"));
    }

    #[test]
    fn test_storage_error_hides_details() {
        let err = Error::StorageUnavailable(sqlx::Error::Protocol(
            "disk I/O error at /var/lib/farmquest/farmquest.db".to_string(),
        ));
        let response = err.to_response();
        assert_eq!(response.error, "storage_unavailable");
        assert!(!response.message.contains("/var/lib"));
    }

    #[test]
    fn test_common_database_error_maps_to_storage() {
        let err: Error = fq_common::Error::Database(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, Error::StorageUnavailable(_)));
    }

    #[test]
    fn test_invalid_range_code() {
        assert_eq!(Error::InvalidRange(150).code(), "invalid_range");
        assert_eq!(Error::Internal("x".into()).to_response().message, "Internal error");
    }
}
