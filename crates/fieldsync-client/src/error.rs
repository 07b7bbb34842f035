//! Error types for the FieldSync client.

use fieldsync_types::ErrorKind;
use thiserror::Error;

/// Errors that can occur when talking to a backend candidate.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Could not reach the server (refused, DNS, TLS, reset).
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    /// The request exceeded its hard timeout.
    #[error("Request timed out")]
    Timeout,

    /// Server returned a non-2xx status.
    #[error("HTTP error ({status}): {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// Server returned a body that is not the expected JSON.
    #[error("Invalid response: {0}")]
    Decoding(String),

    /// The candidate and path do not form a valid URL.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The HTTP client itself could not be constructed.
    #[error("Client setup failed: {0}")]
    Setup(String),
}

impl ClientError {
    /// Map to the error-kind taxonomy stored in connection and sync state.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NetworkUnreachable(_) | Self::InvalidEndpoint(_) | Self::Setup(_) => {
                ErrorKind::NetworkUnreachable
            }
            Self::Timeout => ErrorKind::Timeout,
            Self::Http { status, .. } => ErrorKind::HttpError { status: *status },
            Self::Decoding(_) => ErrorKind::DecodingError,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decoding(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Http {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            Self::NetworkUnreachable(e.to_string())
        }
    }
}
