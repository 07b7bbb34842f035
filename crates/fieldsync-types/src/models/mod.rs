//! Core domain models for FieldSync.
//!
//! This module contains all shared data structures used across the FieldSync crates.

mod connection;
mod entity;
mod server;
mod sync;

// Re-export all models
pub use connection::{ConnectionState, ConnectionStatus};
pub use entity::{
    current_timestamp_ms, AnalyticsSnapshot, CityCount, Contact, Entity, EntityBody,
    EntitySource, Incident, IncidentKind, NewContact, SalesWeek, Salesperson,
};
pub use server::{ServerCandidate, ServerSelection, ServerTestResult, Transport};
pub use sync::{SyncDomain, SyncRecord, SyncReport};
