//! Core error types for grindstone-core.
//!
//! This module defines the error hierarchy used across the reward engine,
//! the record store and configuration handling.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for grindstone-core.
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

    /// A record looked up by id does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A state change that the entity's state machine does not allow
    #[error("Invalid transition for {kind} {id}: {from} -> {to}")]
    InvalidTransition {
        kind: &'static str,
        id: String,
        from: String,
        to: String,
    },

    /// A once-per-day action was already recorded for that day
    #[error("{kind} {id} already recorded for {day}")]
    AlreadyRecorded {
        kind: &'static str,
        id: String,
        day: chrono::NaiveDate,
    },

    /// The user record changed underneath a read-modify-write
    #[error("User {user_id} was modified concurrently (expected version {expected})")]
    Conflict { user_id: String, expected: i64 },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
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

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Value outside its allowed range
    #[error("Value {value} for '{field}' is out of range {min}..={max}")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
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
        CoreError::Database(err.into())
    }
}

impl CoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_sqlite_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(DatabaseError::from(err), DatabaseError::Locked));
    }

    #[test]
    fn other_sqlite_errors_map_to_query_failed() {
        let err = rusqlite::Error::QueryReturnedNoRows;
        assert!(matches!(
            DatabaseError::from(err),
            DatabaseError::QueryFailed(_)
        ));
    }

    #[test]
    fn not_found_message_names_kind_and_id() {
        let err = CoreError::not_found("Task", "t-1");
        assert_eq!(err.to_string(), "Task not found: t-1");
    }
}
