//! Error types for the watchpost change-detection probe.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the fetch collaborator (transport or remote failure)
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Request failed: {0}")]
    Request(String),
}

/// State persistence errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// State exists but cannot be parsed, or its fingerprint does not match its content
    #[error("Stored state at {path:?} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Storage I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(String),
}

impl StorageError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StorageError::Corrupt { .. })
    }
}

/// Per-cycle failure, reported as data in the probe outcome
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to read stored state: {0}")]
    StorageRead(#[source] StorageError),

    /// The comparison still stands, but the next cycle compares against stale state
    #[error("Failed to persist snapshot: {0}")]
    StorageWrite(#[source] StorageError),
}

/// Setup and configuration errors
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl From<config::ConfigError> for MonitorError {
    fn from(err: config::ConfigError) -> Self {
        MonitorError::ConfigError(err.to_string())
    }
}
