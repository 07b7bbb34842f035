//! Entity Converter
//!
//! Pure mapping from remote JSON payloads to local [`Entity`] values.
//!
//! # Pipeline
//!
//! 1. Detect the payload schema by shape (`V2` envelope or `Legacy` rows)
//! 2. Deserialize rows through the schema's row type
//! 3. Derive natural keys and deterministic ids
//! 4. Collapse duplicate natural keys inside the payload (later value wins)
//!
//! No network or persistence side effects: the same payload converted twice
//! yields identical entities, ids included, as long as `issued_at` is the same.

mod keys;
mod lenient;
mod schema;


pub use keys::{contact_key, incident_key, normalize_address, synthesize_id};
pub use schema::{parse_remote_timestamp, RemoteSchema};

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use fieldsync_types::{Entity, EntityBody, EntitySource, Salesperson, SyncDomain};

use crate::error::ConvertError;
use schema::{
    AnalyticsV2, ContactRowV2, HouseRowLegacy, IncidentRow, SalesWeekRow, SalespersonRow,
};

/// Result of converting one domain payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub schema: RemoteSchema,
    /// Unique by natural key, in first-seen order.
    pub entities: Vec<Entity>,
    /// Salesperson records referenced by incidents.
    pub salespeople: Vec<Salesperson>,
}

/// Convert a remote payload for `domain`.
///
/// `issued_at` (unix ms, when the fetch was issued) stamps records whose
/// payload carries no timestamp of its own.
pub fn convert(
    domain: SyncDomain,
    payload: &Value,
    issued_at: i64,
) -> Result<Conversion, ConvertError> {
    let conversion = match domain {
        SyncDomain::Contacts => convert_contacts(payload, issued_at)?,
        SyncDomain::Incidents => convert_incidents(payload, issued_at)?,
        SyncDomain::Analytics => convert_analytics(payload, issued_at)?,
        SyncDomain::RollingSales => convert_rolling_sales(payload, issued_at)?,
    };

    Ok(Conversion {
        entities: dedup_by_key(conversion.entities),
        ..conversion
    })
}

/// Convert the single contact echoed by `POST /contacts`.
pub fn convert_created_contact(payload: &Value, issued_at: i64) -> Result<Entity, ConvertError> {
    let body = payload.get("contact").unwrap_or(payload);
    if !body.is_object() {
        return Err(unknown_shape(SyncDomain::Contacts, body));
    }
    let row = ContactRowV2::deserialize(body).map_err(|e| invalid(SyncDomain::Contacts, 0, e))?;
    let last_updated = row.remote_timestamp().unwrap_or(issued_at);
    let contact = row.into_contact();
    if contact.address.is_empty() {
        return Err(ConvertError::InvalidRecord {
            domain: SyncDomain::Contacts,
            index: 0,
            reason: "missing address".to_string(),
        });
    }
    Ok(contact_entity(contact, last_updated))
}

/// Re-derive `natural_key` and `id` from the entity body, e.g. after an
/// on-device edit changed the address. Remote ids are kept.
pub fn rekey(mut entity: Entity) -> Entity {
    let domain = entity.domain();
    let (natural_key, remote_id) = match &entity.body {
        EntityBody::Contact(c) => (keys::contact_key(&c.address, &c.zip_code), c.remote_id),
        EntityBody::Incident(i) => (
            keys::incident_key(i.remote_id, &i.address, &i.kind),
            i.remote_id,
        ),
        EntityBody::Analytics(_) => (keys::ANALYTICS_KEY.to_string(), None),
        EntityBody::RollingSales(w) => (keys::sales_week_key(&w.week), None),
    };
    entity.id = keys::entity_id(domain, remote_id, &natural_key);
    entity.natural_key = natural_key;
    entity
}

fn convert_contacts(payload: &Value, issued_at: i64) -> Result<Conversion, ConvertError> {
    let domain = SyncDomain::Contacts;
    let (schema, rows) = match payload {
        Value::Object(map) => match map.get("contacts") {
            Some(Value::Array(rows)) => (RemoteSchema::V2, rows),
            _ => return Err(unknown_shape(domain, payload)),
        },
        Value::Array(rows) => (RemoteSchema::Legacy, rows),
        _ => return Err(unknown_shape(domain, payload)),
    };

    let mut entities = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let (contact, stamp) = match schema {
            RemoteSchema::V2 => {
                let row = ContactRowV2::deserialize(row).map_err(|e| invalid(domain, index, e))?;
                let stamp = row.remote_timestamp();
                (row.into_contact(), stamp)
            }
            RemoteSchema::Legacy => {
                let row =
                    HouseRowLegacy::deserialize(row).map_err(|e| invalid(domain, index, e))?;
                let stamp = row.remote_timestamp();
                (row.into_contact(), stamp)
            }
        };

        if contact.address.is_empty() {
            tracing::warn!("Skipping contact row {} without address", index);
            continue;
        }
        entities.push(contact_entity(contact, stamp.unwrap_or(issued_at)));
    }

    Ok(Conversion {
        schema,
        entities,
        salespeople: Vec::new(),
    })
}

fn contact_entity(contact: fieldsync_types::Contact, last_updated: i64) -> Entity {
    let natural_key = keys::contact_key(&contact.address, &contact.zip_code);
    Entity {
        id: keys::entity_id(SyncDomain::Contacts, contact.remote_id, &natural_key),
        natural_key,
        source: EntitySource::Remote,
        last_updated,
        body: EntityBody::Contact(contact),
    }
}

fn convert_incidents(payload: &Value, issued_at: i64) -> Result<Conversion, ConvertError> {
    let domain = SyncDomain::Incidents;
    let (schema, rows, roster) = match payload {
        Value::Object(map) => match map.get("incidents") {
            Some(Value::Array(rows)) => (RemoteSchema::V2, rows, map.get("salespeople")),
            _ => return Err(unknown_shape(domain, payload)),
        },
        Value::Array(rows) => (RemoteSchema::Legacy, rows, None),
        _ => return Err(unknown_shape(domain, payload)),
    };

    let mut salespeople: HashMap<i64, Salesperson> = HashMap::new();
    if let Some(Value::Array(people)) = roster {
        for (index, person) in people.iter().enumerate() {
            let row = SalespersonRow::deserialize(person).map_err(|e| invalid(domain, index, e))?;
            if let Some(person) = row.into_salesperson() {
                salespeople.insert(person.id, person);
            }
        }
    }

    let mut entities = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let row = IncidentRow::deserialize(row).map_err(|e| invalid(domain, index, e))?;
        if let Some(person) = row.salesperson() {
            salespeople.entry(person.id).or_insert(person);
        }

        let last_updated = row.remote_timestamp().unwrap_or(issued_at);
        let incident = row.into_incident();
        if incident.address.is_empty() && incident.remote_id.is_none() {
            tracing::warn!("Skipping incident row {} without address or id", index);
            continue;
        }

        let natural_key = keys::incident_key(incident.remote_id, &incident.address, &incident.kind);
        entities.push(Entity {
            id: keys::entity_id(domain, incident.remote_id, &natural_key),
            natural_key,
            source: EntitySource::Remote,
            last_updated,
            body: EntityBody::Incident(incident),
        });
    }

    let mut salespeople: Vec<Salesperson> = salespeople.into_values().collect();
    salespeople.sort_by_key(|p| p.id);

    Ok(Conversion {
        schema,
        entities,
        salespeople,
    })
}

fn convert_analytics(payload: &Value, issued_at: i64) -> Result<Conversion, ConvertError> {
    let domain = SyncDomain::Analytics;
    let body = match payload.get("analytics") {
        Some(inner) if inner.is_object() => inner,
        _ => payload,
    };
    if !body.is_object() || body.get("total_contacts").is_none() {
        return Err(unknown_shape(domain, payload));
    }

    let analytics = AnalyticsV2::deserialize(body).map_err(|e| invalid(domain, 0, e))?;
    let last_updated = analytics.remote_timestamp().unwrap_or(issued_at);
    let natural_key = keys::ANALYTICS_KEY.to_string();

    Ok(Conversion {
        schema: RemoteSchema::V2,
        entities: vec![Entity {
            id: keys::synthesize_id(domain, &natural_key),
            natural_key,
            source: EntitySource::Remote,
            last_updated,
            body: EntityBody::Analytics(analytics.into_snapshot()),
        }],
        salespeople: Vec::new(),
    })
}

fn convert_rolling_sales(payload: &Value, issued_at: i64) -> Result<Conversion, ConvertError> {
    let domain = SyncDomain::RollingSales;
    let (schema, rows) = match payload {
        Value::Object(map) => match map.get("weekly_sales") {
            Some(Value::Array(rows)) => (RemoteSchema::V2, rows),
            _ => return Err(unknown_shape(domain, payload)),
        },
        Value::Array(rows) => (RemoteSchema::Legacy, rows),
        _ => return Err(unknown_shape(domain, payload)),
    };

    let mut entities = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let week = SalesWeekRow::deserialize(row)
            .map_err(|e| invalid(domain, index, e))?
            .into_week();
        if week.week.is_empty() {
            return Err(ConvertError::InvalidRecord {
                domain,
                index,
                reason: "empty week".to_string(),
            });
        }

        let natural_key = keys::sales_week_key(&week.week);
        entities.push(Entity {
            id: keys::synthesize_id(domain, &natural_key),
            natural_key,
            source: EntitySource::Remote,
            last_updated: issued_at,
            body: EntityBody::RollingSales(week),
        });
    }

    Ok(Conversion {
        schema,
        entities,
        salespeople: Vec::new(),
    })
}

/// Keep one entity per natural key: later `last_updated` wins, on tie the
/// later row. Output keeps first-seen key order.
fn dedup_by_key(entities: Vec<Entity>) -> Vec<Entity> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Entity> = Vec::with_capacity(entities.len());

    for entity in entities {
        match positions.get(&entity.natural_key) {
            Some(&pos) => {
                if let Some(existing) = unique.get_mut(pos) {
                    if entity.last_updated >= existing.last_updated {
                        tracing::debug!(
                            "Duplicate natural key '{}' in payload, keeping later value",
                            entity.natural_key
                        );
                        *existing = entity;
                    }
                }
            }
            None => {
                positions.insert(entity.natural_key.clone(), unique.len());
                unique.push(entity);
            }
        }
    }

    unique
}

fn unknown_shape(domain: SyncDomain, payload: &Value) -> ConvertError {
    let found = match payload {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(items) => format!("array of {}", items.len()),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).take(5).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
    };
    ConvertError::UnknownShape { domain, found }
}

fn invalid(domain: SyncDomain, index: usize, e: serde_json::Error) -> ConvertError {
    ConvertError::InvalidRecord {
        domain,
        index,
        reason: e.to_string(),
    }
}
