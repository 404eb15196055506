//! Core error types for habitloop-core.
//!
//! The engine is entirely background work, so there is no user-facing error
//! surface. The taxonomy maps host failures to the recovery layer that
//! absorbs them:
//! - exact-alarm denial is a value (`RegisterOutcome::ExactDenied`), never
//!   an error;
//! - a habit vanishing between registration and fire is a silent return;
//! - per-habit failures during bulk replays are caught and logged at the
//!   loop boundary;
//! - only a whole-pass failure in the backstop surfaces, as a retry signal.

use std::path::PathBuf;
use thiserror::Error;

/// Failures crossing one of the host ports (alarm table, channel table,
/// repository, notification delivery).
#[derive(Error, Debug)]
pub enum PortError {
    #[error("alarm table error: {0}")]
    Alarm(String),

    #[error("channel table error: {0}")]
    Channel(String),

    #[error("habit repository error: {0}")]
    Repository(String),

    #[error("notification request error: {0}")]
    Notification(String),
}

/// Core error type for habitloop-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A host port failed
    #[error("port error: {0}")]
    Port(#[from] PortError),

    /// Configuration-related errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
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

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
