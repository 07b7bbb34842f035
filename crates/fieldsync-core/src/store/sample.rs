//! Demo data shown on first run without cache or connectivity.
//!
//! Rows go through the regular converter so sample entities carry the same
//! keys and ids a real sync of the same rows would produce.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use fieldsync_types::{EntitySource, SyncDomain};

use super::merge::DomainMap;
use super::StateSnapshot;
use crate::converter;

/// Fixed stamp so the sample is identical on every build (2024-01-22T00:00:00Z).
const SAMPLE_ISSUED_AT: i64 = 1_705_881_600_000;

fn houses() -> Value {
    json!([
        {"id": 1, "address": "123 Main St", "city": "Wilmington", "state": "NC", "zip_code": "28401",
         "latitude": 34.2257, "longitude": -77.9447, "contact_name": "John Smith",
         "contact_email": "john@email.com", "contact_phone": "910-555-0101",
         "fiber_available": true, "adt_detected": false, "status": "not_contacted",
         "created_at": "2024-01-15 00:00:00"},
        {"id": 2, "address": "456 Oak Ave", "city": "Leland", "state": "NC", "zip_code": "28451",
         "latitude": 34.2563, "longitude": -78.0447, "contact_name": "Jane Doe",
         "contact_email": "jane@email.com", "contact_phone": "910-555-0102",
         "fiber_available": false, "adt_detected": true, "status": "not_contacted",
         "created_at": "2024-01-16 00:00:00"},
        {"id": 3, "address": "789 Pine Rd", "city": "Southport", "state": "NC", "zip_code": "28461",
         "latitude": 33.9207, "longitude": -78.0189, "contact_name": "Bob Johnson",
         "contact_email": "bob@email.com", "contact_phone": "910-555-0103",
         "fiber_available": true, "adt_detected": false, "status": "not_contacted",
         "created_at": "2024-01-17 00:00:00"},
        {"id": 4, "address": "321 Elm St", "city": "Wilmington", "state": "NC", "zip_code": "28403",
         "latitude": 34.2357, "longitude": -77.8547, "contact_name": "Alice Brown",
         "contact_email": "alice@email.com", "contact_phone": "910-555-0104",
         "fiber_available": false, "adt_detected": true, "status": "not_contacted",
         "created_at": "2024-01-18 00:00:00"},
        {"id": 5, "address": "654 Maple Dr", "city": "Leland", "state": "NC", "zip_code": "28451",
         "latitude": 34.2463, "longitude": -78.0347, "contact_name": "Charlie Wilson",
         "contact_email": "charlie@email.com", "contact_phone": "910-555-0105",
         "fiber_available": true, "adt_detected": false, "status": "not_contacted",
         "created_at": "2024-01-19 00:00:00"}
    ])
}

fn incidents() -> Value {
    json!({
        "incidents": [
            {"id": 1, "address": "123 Main St", "incident_type": "fire",
             "description": "House fire in neighborhood", "latitude": 34.2257, "longitude": -77.9447,
             "assigned_salesperson_id": 1, "status": "active", "created_at": "2024-01-20 00:00:00"},
            {"id": 2, "address": "456 Oak Ave", "incident_type": "break-in",
             "description": "Recent break-in reported", "latitude": 34.2563, "longitude": -78.0447,
             "assigned_salesperson_id": 2, "status": "active", "created_at": "2024-01-21 00:00:00"}
        ],
        "salespeople": [
            {"id": 1, "name": "Mike Sales", "email": "mike@company.com", "phone": "910-555-0201"},
            {"id": 2, "name": "Sarah Closer", "email": "sarah@company.com", "phone": "910-555-0202"},
            {"id": 3, "name": "Tom Door", "email": "tom@company.com", "phone": "910-555-0203"}
        ]
    })
}

fn analytics() -> Value {
    json!({
        "total_contacts": 5,
        "fiber_contacts": 3,
        "recent_contacts": 0,
        "conversion_rate": 0.0,
        "weekly_growth": 0.0,
        "top_cities": [
            {"city": "Wilmington", "count": 2},
            {"city": "Leland", "count": 2},
            {"city": "Southport", "count": 1}
        ],
        "timestamp": "2024-01-22T00:00:00"
    })
}

fn rolling_sales() -> Value {
    json!({
        "weekly_sales": [
            {"week": "2024-01-01", "sales": 3, "revenue": 2550.0},
            {"week": "2024-01-08", "sales": 5, "revenue": 4250.0},
            {"week": "2024-01-15", "sales": 4, "revenue": 3400.0},
            {"week": "2024-01-22", "sales": 6, "revenue": 5100.0}
        ]
    })
}

/// Build the sample snapshot. A payload that fails to convert leaves its
/// domain empty; the other domains are unaffected.
pub(super) fn sample_snapshot() -> StateSnapshot {
    let payloads = [
        (SyncDomain::Contacts, houses()),
        (SyncDomain::Incidents, incidents()),
        (SyncDomain::Analytics, analytics()),
        (SyncDomain::RollingSales, rolling_sales()),
    ];

    let mut domains = BTreeMap::new();
    let mut salespeople = BTreeMap::new();

    for (domain, payload) in payloads {
        match converter::convert(domain, &payload, SAMPLE_ISSUED_AT) {
            Ok(conversion) => {
                let map: DomainMap = conversion
                    .entities
                    .into_iter()
                    .map(|mut entity| {
                        entity.source = EntitySource::Sample;
                        (entity.natural_key.clone(), entity)
                    })
                    .collect();
                domains.insert(domain, Arc::new(map));
                salespeople.extend(conversion.salespeople.into_iter().map(|p| (p.id, p)));
            }
            Err(e) => tracing::error!("Sample {} payload rejected: {}", domain, e),
        }
    }

    StateSnapshot {
        domains,
        salespeople: Arc::new(salespeople),
        sample: true,
        ..StateSnapshot::default()
    }
}
