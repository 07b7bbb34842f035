use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ErrorKind;

/// Wire transport of a candidate endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Http,
    Https,
}

impl Transport {
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// One configured backend endpoint the resolver may select.
///
/// Lower `priority` is tried first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ServerCandidate {
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub transport: Transport,
    #[serde(default)]
    pub priority: u32,
}

impl ServerCandidate {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        transport: Transport,
        priority: u32,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            transport,
            priority,
        }
    }

    /// `scheme://host:port` without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.transport.scheme(), self.host, self.port)
    }

    /// Whether a persisted selection refers to this candidate.
    pub fn matches(&self, selection: &ServerSelection) -> bool {
        self.name == selection.name && self.host == selection.host && self.port == selection.port
    }
}

impl fmt::Display for ServerCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.base_url())
    }
}

/// Persisted last-known-good server choice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSelection {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Position of the candidate in the priority-ordered registry at selection time.
    pub index: usize,
}

impl ServerSelection {
    pub fn from_candidate(candidate: &ServerCandidate, index: usize) -> Self {
        Self {
            name: candidate.name.clone(),
            host: candidate.host.clone(),
            port: candidate.port,
            index,
        }
    }
}

/// Diagnostic outcome of probing a single candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerTestResult {
    pub candidate: ServerCandidate,
    pub available: bool,
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    pub error: Option<ErrorKind>,
    /// Free-form detail from the transport layer, for troubleshooting screens.
    pub detail: Option<String>,
}
