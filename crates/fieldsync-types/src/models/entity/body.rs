use serde::{Deserialize, Serialize};
use std::fmt;

/// A prospect household (a "house" in the legacy desk server).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Contact {
    pub remote_id: Option<i64>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub owner_name: String,
    pub owner_email: Option<String>,
    pub owner_phone: Option<String>,
    pub fiber_available: bool,
    /// Only reported by the legacy schema.
    pub adt_detected: Option<bool>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Pipeline status (`new`, `visited`, ...), legacy schema only.
    pub status: Option<String>,
    pub notes: Option<String>,
    pub created_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IncidentKind {
    Fire,
    BreakIn,
    Flood,
    Theft,
    Other(String),
}

impl IncidentKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Fire => "fire",
            Self::BreakIn => "break-in",
            Self::Flood => "flood",
            Self::Theft => "theft",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for IncidentKind {
    fn from(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "fire" | "house fire" => Self::Fire,
            "break-in" | "break_in" | "breakin" | "break in" | "burglary" => Self::BreakIn,
            "flood" | "flooding" => Self::Flood,
            "theft" | "package theft" | "package_theft" => Self::Theft,
            _ => Self::Other(normalized),
        }
    }
}

impl From<String> for IncidentKind {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<IncidentKind> for String {
    fn from(kind: IncidentKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A neighborhood event (fire, break-in, ...) that makes a lead worth visiting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Incident {
    pub remote_id: Option<i64>,
    pub address: String,
    pub kind: IncidentKind,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Resolved through the salesperson index, never embedded.
    pub assigned_salesperson_id: Option<i64>,
    pub status: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Salesperson {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CityCount {
    pub city: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AnalyticsSnapshot {
    pub total_contacts: u64,
    pub fiber_contacts: u64,
    pub recent_contacts: u64,
    /// Percent, e.g. `15.5`.
    pub conversion_rate: f64,
    pub weekly_growth: f64,
    pub top_cities: Vec<CityCount>,
    pub generated_at: Option<String>,
}

/// One row of the rolling weekly sales report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalesWeek {
    /// Week start date, `YYYY-MM-DD`.
    pub week: String,
    pub sales: u64,
    pub revenue: f64,
}

/// Body of `POST /contacts`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NewContact {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub owner_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_phone: Option<String>,
    #[serde(default)]
    pub fiber_available: bool,
}

impl NewContact {
    /// Required fields the backend rejects the request without.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("zip_code", &self.zip_code),
            ("owner_name", &self.owner_name),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}
