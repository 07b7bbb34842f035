//! Unified error types for FieldSync Core.

use fieldsync_types::{ErrorKind, SyncDomain};
use thiserror::Error;

/// Configuration and persistence failures.
///
/// Sync and connection failures are not errors at this level; they are
/// recorded as [`ErrorKind`]s in state.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client could not be set up.
    #[error("Client error: {0}")]
    Client(#[from] fieldsync_client::ClientError),
}

/// Result type alias for FieldSync Core operations.
pub type AppResult<T> = Result<T, AppError>;

/// A remote payload that does not match any known schema for its domain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("{domain}: unrecognized payload shape ({found})")]
    UnknownShape { domain: SyncDomain, found: String },

    #[error("{domain}: record {index} is invalid: {reason}")]
    InvalidRecord {
        domain: SyncDomain,
        index: usize,
        reason: String,
    },
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::DecodingError
    }
}
