//! Tagged domain entity type.
//!
//! Every business record the client knows about is an [`Entity`]: shared
//! identity and bookkeeping (id, natural key, source, timestamp) around an
//! [`EntityBody`] variant per domain. Conversion from the various remote
//! payload shapes happens in `fieldsync-core`; this module only defines the
//! local representation and the Last-Write-Wins comparison used when merging.

mod body;


pub use body::{
    AnalyticsSnapshot, CityCount, Contact, Incident, IncidentKind, NewContact, SalesWeek,
    Salesperson,
};

use serde::{Deserialize, Serialize};

use super::sync::SyncDomain;

/// Where the current value of an entity came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntitySource {
    /// Converted from a live fetch in this session.
    Remote,
    /// Loaded from the persisted snapshot.
    Cached,
    /// Built-in demo data for first run without connectivity.
    Sample,
    /// Edited on the device and not yet superseded by a newer remote value.
    LocalEdit,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EntityBody {
    Contact(Contact),
    Incident(Incident),
    Analytics(AnalyticsSnapshot),
    RollingSales(SalesWeek),
}

impl EntityBody {
    pub fn domain(&self) -> SyncDomain {
        match self {
            Self::Contact(_) => SyncDomain::Contacts,
            Self::Incident(_) => SyncDomain::Incidents,
            Self::Analytics(_) => SyncDomain::Analytics,
            Self::RollingSales(_) => SyncDomain::RollingSales,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    /// Stable local identity; remote id when the backend has one, else derived
    /// from the natural key.
    pub id: String,
    /// Content-derived deduplication key, unique within a domain.
    pub natural_key: String,
    pub source: EntitySource,
    /// Unix timestamp in milliseconds of the value held in `body`.
    pub last_updated: i64,
    pub body: EntityBody,
}

impl Entity {
    pub fn domain(&self) -> SyncDomain {
        self.body.domain()
    }

    /// LWW comparison: returns true if self should replace other.
    /// Order: higher timestamp wins, on tie: a local edit wins over anything else.
    pub fn wins_over(&self, other: &Self) -> bool {
        if self.last_updated != other.last_updated {
            return self.last_updated > other.last_updated;
        }
        self.source == EntitySource::LocalEdit && other.source != EntitySource::LocalEdit
    }

    /// Re-stamp as an on-device edit made at `edited_at`.
    pub fn into_local_edit(mut self, edited_at: i64) -> Self {
        self.source = EntitySource::LocalEdit;
        self.last_updated = edited_at;
        self
    }

    pub fn as_contact(&self) -> Option<&Contact> {
        match &self.body {
            EntityBody::Contact(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_incident(&self) -> Option<&Incident> {
        match &self.body {
            EntityBody::Incident(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_analytics(&self) -> Option<&AnalyticsSnapshot> {
        match &self.body {
            EntityBody::Analytics(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_sales_week(&self) -> Option<&SalesWeek> {
        match &self.body {
            EntityBody::RollingSales(w) => Some(w),
            _ => None,
        }
    }
}

pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
