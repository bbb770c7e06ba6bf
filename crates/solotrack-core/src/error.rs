//! Core error types for solotrack-core.
//!
//! The currency engine and the notification decision functions are total and
//! never return these. Errors only come from I/O (SQLite, the config file),
//! from validating flight input, and from the host's dispatcher.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for solotrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Notification delivery errors
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// No flight with the given id
    #[error("Flight not found: {0}")]
    FlightNotFound(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// The flight carries an instructor signature and cannot be changed
    #[error("Flight {0} is signed by an instructor; void the signature first")]
    SignatureLocked(String),

    /// Unrecognized training stage name
    #[error("Unknown training stage '{0}' (expected pre_solo, post_solo or checkride_prep)")]
    UnknownTrainingStage(String),
}

/// Errors reported by a notification dispatcher.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The platform refused delivery (e.g. not authorized)
    #[error("Delivery refused for '{category}': {reason}")]
    Refused { category: String, reason: String },

    /// Delivery was attempted and failed
    #[error("Delivery failed: {0}")]
    Failed(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(DatabaseError::from(err))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_converts_into_core_error() {
        let err: CoreError = ValidationError::InvalidValue {
            field: "duration_hours".into(),
            message: "must be >= 0".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Validation error: Invalid value for 'duration_hours': must be >= 0"
        );
    }

    #[test]
    fn query_returned_no_rows_maps_to_query_failed() {
        let err = DatabaseError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, DatabaseError::QueryFailed(_)));
    }
}
