//! Error types for wex.
//!
//! The query builder itself never fails; these errors come from the
//! plumbing around it (configuration, settings, schema snapshots, the
//! warehouse connection and the output files).

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for wex operations.
#[derive(Debug, Error)]
pub enum WexError {
    /// Failed to parse a filter expression.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Invalid extraction configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A settings or configuration file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Referenced environment variable is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// Schema snapshot could not be loaded or introspected.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution error.
    #[error("Execution error: {0}")]
    Execution(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl WexError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type alias for wex operations.
pub type WexResult<T> = Result<T, WexError>;
