//! Error types for artifact-dl
//!
//! Only failures detected before any transfer starts are reported through
//! [`Error`]: invalid configuration or an unusable destination directory.
//! Everything that goes wrong while fetching an individual URL is converted
//! into a [`DownloadOutcome`](crate::DownloadOutcome) instead, so a batch
//! always completes with one result per URL.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for artifact-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for artifact-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrency")
        key: Option<String>,
    },

    /// The destination directory could not be created or is not a directory
    #[error("destination {} is unusable: {reason}", path.display())]
    Destination {
        /// The requested destination directory
        path: PathBuf,
        /// Why the directory cannot be used
        reason: String,
    },

    /// Serialization error (config loading)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A source location that cannot be requested
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected input
        url: String,
        /// Parser or scheme error
        reason: String,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a [`Error::Config`] naming the offending key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
