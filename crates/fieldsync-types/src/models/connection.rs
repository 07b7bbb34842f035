use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::server::ServerCandidate;
use crate::error::ErrorKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "status", content = "candidate")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected(ServerCandidate),
}

/// The one connection state of an app session.
///
/// Written only by the connection resolver; everyone else gets clones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub active_candidate: Option<ServerCandidate>,
    pub last_error: Option<ErrorKind>,
    pub last_probe_time: Option<DateTime<Utc>>,
    /// Human-readable status line for the UI.
    pub message: String,
}

impl ConnectionState {
    pub fn disconnected() -> Self {
        Self {
            message: "Not connected".to_string(),
            ..Default::default()
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.status, ConnectionStatus::Connected(_))
    }
}
