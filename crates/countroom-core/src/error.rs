//! Core error types for countroom-core.
//!
//! Validation failures are reported synchronously and never mutate state.
//! Persistence failures are surfaced to the caller but the in-memory
//! registry stays authoritative for the running session.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::TimerStatus;

/// Core error type for countroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid timer creation input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Store read/write failures
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Operation targets a timer id that is not in the active set
    #[error("Timer not found: {0}")]
    NotFound(String),

    /// The requested action is not allowed from the timer's current status
    #[error("Cannot {action} timer {id} while it is {from:?}")]
    InvalidTransition {
        id: String,
        from: TimerStatus,
        action: &'static str,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Validation errors for user-supplied timer input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was empty or whitespace only
    #[error("'{field}' must not be empty")]
    EmptyField { field: &'static str },

    /// Duration was zero
    #[error("duration must be greater than zero seconds")]
    NonPositiveDuration,

    /// Duration exceeds what the HH:MM:SS display can show
    #[error("duration of {seconds}s exceeds the maximum of {max}s")]
    DurationTooLong { seconds: u64, max: u64 },

    /// Name longer than the display allows
    #[error("name is {len} characters long, the maximum is {max}")]
    NameTooLong { len: usize, max: usize },

    /// Duration text could not be parsed
    #[error("cannot parse duration '{0}' (try 90, 45s, 5m, 1h30m or 01:30:00)")]
    InvalidDuration(String),
}

/// Persistence store errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Failed to open the backing store
    #[error("Failed to open store at {path}: {message}")]
    Open { path: PathBuf, message: String },

    /// Reading a key failed
    #[error("Failed to read '{key}': {message}")]
    Read { key: String, message: String },

    /// Writing a key failed
    #[error("Failed to write '{key}': {message}")]
    Write { key: String, message: String },

    /// The stored blob is not valid for the expected collection
    #[error("Stored value for '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
