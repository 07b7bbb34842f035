//! Natural keys and deterministic identifiers.

use fieldsync_types::{IncidentKind, SyncDomain};
use sha2::{Digest, Sha256};

const SUFFIXES: &[(&str, &str)] = &[
    ("street", "st"),
    ("avenue", "ave"),
    ("road", "rd"),
    ("drive", "dr"),
    ("lane", "ln"),
    ("court", "ct"),
    ("boulevard", "blvd"),
];

/// Lowercase, strip punctuation, collapse whitespace, abbreviate street suffixes.
///
/// `"123  Main Street."` and `"123 main st"` normalize to the same string.
pub fn normalize_address(address: &str) -> String {
    let mut cleaned = String::with_capacity(address.len());
    for c in address.chars() {
        if c.is_alphanumeric() {
            cleaned.extend(c.to_lowercase());
        } else {
            cleaned.push(' ');
        }
    }

    cleaned
        .split_whitespace()
        .map(|word| {
            SUFFIXES
                .iter()
                .find(|(long, _)| *long == word)
                .map_or(word, |(_, short)| *short)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// First five digits of a ZIP or ZIP+4.
pub fn normalize_zip(zip: &str) -> String {
    zip.chars().filter(char::is_ascii_digit).take(5).collect()
}

pub fn contact_key(address: &str, zip_code: &str) -> String {
    format!("{}|{}", normalize_address(address), normalize_zip(zip_code))
}

pub fn incident_key(remote_id: Option<i64>, address: &str, kind: &IncidentKind) -> String {
    match remote_id {
        Some(id) => format!("id:{}", id),
        None => format!("{}|{}", normalize_address(address), kind.as_str()),
    }
}

pub const ANALYTICS_KEY: &str = "summary";

pub fn sales_week_key(week: &str) -> String {
    week.trim().to_string()
}

fn id_prefix(domain: SyncDomain) -> &'static str {
    match domain {
        SyncDomain::Contacts => "contact",
        SyncDomain::Incidents => "incident",
        SyncDomain::Analytics => "analytics",
        SyncDomain::RollingSales => "week",
    }
}

/// Remote id when the backend supplied one, otherwise a hash of the natural key.
///
/// Converting the same record twice always yields the same id.
pub fn entity_id(domain: SyncDomain, remote_id: Option<i64>, natural_key: &str) -> String {
    match remote_id {
        Some(id) => format!("{}-{}", id_prefix(domain), id),
        None => synthesize_id(domain, natural_key),
    }
}

pub fn synthesize_id(domain: SyncDomain, natural_key: &str) -> String {
    let digest = Sha256::digest(format!("{}:{}", domain.as_str(), natural_key).as_bytes());
    let short: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
    format!("{}-{}", id_prefix(domain), short)
}
