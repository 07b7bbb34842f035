//! Error kinds for connection and sync failures.
//!
//! These are kinds, not transport errors: they are stored inside
//! [`ConnectionState`](crate::ConnectionState) and
//! [`SyncRecord`](crate::SyncRecord), so they must be:
//!
//! - **Serializable** for persistence and diagnostics
//! - **Cloneable** so snapshots can be shared with readers
//! - **Matchable** for recovery decisions

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of everything that can go wrong while talking to a backend.
///
/// None of these are fatal. Per-candidate kinds are absorbed by the resolver,
/// per-domain kinds by the orchestrator.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "details")]
pub enum ErrorKind {
    /// Connection refused, DNS failure, TLS failure, reset.
    #[error("Network unreachable")]
    NetworkUnreachable,

    /// The request did not complete within its hard timeout.
    #[error("Request timed out")]
    Timeout,

    /// The server answered with a non-2xx status.
    #[error("HTTP error {status}")]
    HttpError { status: u16 },

    /// The payload could not be decoded or converted.
    #[error("Malformed response payload")]
    DecodingError,

    /// Every configured candidate failed its health probe.
    #[error("All server candidates exhausted")]
    AllCandidatesExhausted,
}

impl ErrorKind {
    /// Transport-level failures suggest the active server has gone away.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::NetworkUnreachable | Self::Timeout)
    }
}
