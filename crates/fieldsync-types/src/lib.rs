//! # FieldSync Types
//!
//! Core types, models, and error kinds for the FieldSync client.
//!
//! This crate provides the foundational type system shared by the
//! FieldSync crates:
//!
//! - **`error`** - The error-kind taxonomy surfaced in connection and sync state
//! - **`models`** - Server candidates, connection state, sync records and the
//!   tagged domain entity type
//!
//! ## Architecture Role
//!
//! `fieldsync-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!                fieldsync-types (this crate)
//!                        │
//!            ┌───────────┴───────────┐
//!            ▼                       ▼
//!     fieldsync-client ───────▶ fieldsync-core
//!                                    │
//!                                    ▼
//!                              fieldsync-cli
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for persistence and diagnostics
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

pub use error::ErrorKind;

pub use models::{
    current_timestamp_ms, AnalyticsSnapshot, CityCount, ConnectionState, ConnectionStatus,
    Contact, Entity, EntityBody, EntitySource, Incident, IncidentKind, NewContact, SalesWeek,
    Salesperson, ServerCandidate, ServerSelection, ServerTestResult, SyncDomain, SyncRecord,
    SyncReport, Transport,
};
