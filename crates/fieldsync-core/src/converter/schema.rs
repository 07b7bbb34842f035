//! Known remote payload schemas.
//!
//! `V2` is the cloud API (envelope objects, owner_* fields). `Legacy` is the
//! desk server's raw house/incident rows. Each schema has its own row type
//! and conversion into the shared entity bodies.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use fieldsync_types::{
    AnalyticsSnapshot, CityCount, Contact, Incident, IncidentKind, SalesWeek, Salesperson,
};

use super::lenient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteSchema {
    V2,
    Legacy,
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct ContactRowV2 {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub state: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub zip_code: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub owner_name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub owner_email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub owner_phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::flex_bool")]
    pub fiber_available: bool,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub created_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub updated_at: Option<String>,
}

impl ContactRowV2 {
    pub fn remote_timestamp(&self) -> Option<i64> {
        first_timestamp(&[self.updated_at.as_deref(), self.created_date.as_deref()])
    }

    pub fn into_contact(self) -> Contact {
        Contact {
            remote_id: self.id,
            address: self.address.trim().to_string(),
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            owner_name: self.owner_name,
            owner_email: self.owner_email,
            owner_phone: self.owner_phone,
            fiber_available: self.fiber_available,
            adt_detected: None,
            latitude: self.latitude,
            longitude: self.longitude,
            status: None,
            notes: None,
            created_date: self.created_date,
        }
    }
}

/// A `houses` row from the desk server.
#[derive(Debug, Deserialize)]
pub(super) struct HouseRowLegacy {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub address: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub state: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub zip_code: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub contact_name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub contact_email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub contact_phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::flex_bool")]
    pub fiber_available: bool,
    #[serde(default, deserialize_with = "lenient::opt_flex_bool")]
    pub adt_detected: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub created_at: Option<String>,
}

impl HouseRowLegacy {
    pub fn remote_timestamp(&self) -> Option<i64> {
        first_timestamp(&[self.created_at.as_deref()])
    }

    pub fn into_contact(self) -> Contact {
        Contact {
            remote_id: self.id,
            address: self.address.trim().to_string(),
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            owner_name: self.contact_name,
            owner_email: self.contact_email,
            owner_phone: self.contact_phone,
            fiber_available: self.fiber_available,
            adt_detected: self.adt_detected,
            latitude: self.latitude,
            longitude: self.longitude,
            status: self.status,
            notes: self.notes,
            created_date: self.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Incidents
// ---------------------------------------------------------------------------

/// Incident rows share their columns across schemas; only the legacy rows
/// carry the joined `salesperson_name`.
#[derive(Debug, Deserialize)]
pub(super) struct IncidentRow {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub address: String,
    #[serde(default, alias = "type", deserialize_with = "lenient::string")]
    pub incident_type: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub description: Option<String>,
    #[serde(default, alias = "lat", deserialize_with = "lenient::opt_f64")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lng", deserialize_with = "lenient::opt_f64")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub assigned_salesperson_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub salesperson_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub updated_at: Option<String>,
}

impl IncidentRow {
    pub fn remote_timestamp(&self) -> Option<i64> {
        first_timestamp(&[self.updated_at.as_deref(), self.created_at.as_deref()])
    }

    /// Back-reference target named in the row, if any.
    pub fn salesperson(&self) -> Option<Salesperson> {
        match (self.assigned_salesperson_id, &self.salesperson_name) {
            (Some(id), Some(name)) => Some(Salesperson {
                id,
                name: name.clone(),
                email: None,
                phone: None,
            }),
            _ => None,
        }
    }

    pub fn into_incident(self) -> Incident {
        Incident {
            remote_id: self.id,
            address: self.address.trim().to_string(),
            kind: IncidentKind::from(self.incident_type.as_str()),
            description: self.description,
            latitude: self.latitude,
            longitude: self.longitude,
            assigned_salesperson_id: self.assigned_salesperson_id,
            status: self.status.unwrap_or_else(|| "active".to_string()),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SalespersonRow {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub phone: Option<String>,
}

impl SalespersonRow {
    pub fn into_salesperson(self) -> Option<Salesperson> {
        let id = self.id?;
        Some(Salesperson {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
        })
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct AnalyticsV2 {
    #[serde(deserialize_with = "lenient::count")]
    pub total_contacts: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub fiber_contacts: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub recent_contacts: u64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub conversion_rate: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub weekly_growth: f64,
    #[serde(default)]
    pub top_cities: Vec<CityRow>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CityRow {
    #[serde(default, deserialize_with = "lenient::string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient::count")]
    pub count: u64,
}

impl AnalyticsV2 {
    pub fn remote_timestamp(&self) -> Option<i64> {
        first_timestamp(&[self.timestamp.as_deref()])
    }

    pub fn into_snapshot(self) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            total_contacts: self.total_contacts,
            fiber_contacts: self.fiber_contacts,
            recent_contacts: self.recent_contacts,
            conversion_rate: self.conversion_rate,
            weekly_growth: self.weekly_growth,
            top_cities: self
                .top_cities
                .into_iter()
                .map(|c| CityCount {
                    city: c.city,
                    count: c.count,
                })
                .collect(),
            generated_at: self.timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Rolling sales
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct SalesWeekRow {
    #[serde(deserialize_with = "lenient::string")]
    pub week: String,
    #[serde(default, deserialize_with = "lenient::count")]
    pub sales: u64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub revenue: f64,
}

impl SalesWeekRow {
    pub fn into_week(self) -> SalesWeek {
        SalesWeek {
            week: self.week.trim().to_string(),
            sales: self.sales,
            revenue: self.revenue,
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Parse the timestamp formats the backends emit into unix millis.
///
/// RFC 3339, Python `isoformat()` without offset, SQLite `CURRENT_TIMESTAMP`
/// and bare dates. Offset-less values are taken as UTC.
pub fn parse_remote_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

fn first_timestamp(candidates: &[Option<&str>]) -> Option<i64> {
    candidates
        .iter()
        .flatten()
        .find_map(|raw| parse_remote_timestamp(raw))
}
