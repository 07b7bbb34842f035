use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ErrorKind;

/// One category of business data synchronized independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SyncDomain {
    Contacts,
    Incidents,
    Analytics,
    RollingSales,
}

impl SyncDomain {
    pub const ALL: [SyncDomain; 4] = [
        SyncDomain::Contacts,
        SyncDomain::Incidents,
        SyncDomain::Analytics,
        SyncDomain::RollingSales,
    ];

    /// Path segment of the read endpoint, relative to the API base path.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Contacts => "contacts",
            Self::Incidents => "incidents",
            Self::Analytics => "analytics",
            Self::RollingSales => "rolling-sales",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contacts => "contacts",
            Self::Incidents => "incidents",
            Self::Analytics => "analytics",
            Self::RollingSales => "rolling_sales",
        }
    }
}

impl fmt::Display for SyncDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single domain fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncRecord {
    pub domain: SyncDomain,
    pub sequence_number: u64,
    /// Fetch and conversion both succeeded.
    pub success: bool,
    /// The converted result was committed to the store (false when stale).
    pub applied: bool,
    pub item_count: usize,
    pub error: Option<ErrorKind>,
    pub fetched_at: DateTime<Utc>,
}

impl SyncRecord {
    pub fn failed(domain: SyncDomain, sequence_number: u64, error: ErrorKind) -> Self {
        Self {
            domain,
            sequence_number,
            success: false,
            applied: false,
            item_count: 0,
            error: Some(error),
            fetched_at: Utc::now(),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.success && !self.applied
    }
}

/// Result of one refresh cycle across all domains.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncReport {
    pub records: Vec<SyncRecord>,
    /// `None` when no server could be resolved.
    pub server: Option<String>,
    pub connection_error: Option<ErrorKind>,
    /// `Some(ok)` when the opportunistic server-side sync was attempted.
    pub server_sync: Option<bool>,
    pub last_sync: Option<DateTime<Utc>>,
}

impl SyncReport {
    pub fn disconnected(error: ErrorKind, last_sync: Option<DateTime<Utc>>) -> Self {
        Self {
            records: Vec::new(),
            server: None,
            connection_error: Some(error),
            server_sync: None,
            last_sync,
        }
    }

    pub fn record(&self, domain: SyncDomain) -> Option<&SyncRecord> {
        self.records.iter().find(|r| r.domain == domain)
    }

    pub fn applied_count(&self) -> usize {
        self.records.iter().filter(|r| r.applied).count()
    }

    pub fn failed_count(&self) -> usize {
        self.records.iter().filter(|r| !r.success).count()
    }

    pub fn any_applied(&self) -> bool {
        self.applied_count() > 0
    }
}
