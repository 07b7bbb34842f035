//! On-disk form of the store.
//!
//! Reads never fail: a missing file is an empty state, an unreadable or
//! unparseable one is moved aside to `*.corrupt` and treated as empty.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fieldsync_types::{Entity, Salesperson, ServerSelection, SyncDomain};

use crate::error::AppResult;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedSnapshot {
    pub version: u32,
    #[serde(default)]
    pub domains: BTreeMap<SyncDomain, Vec<Entity>>,
    #[serde(default)]
    pub salespeople: Vec<Salesperson>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

impl Default for PersistedSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            domains: BTreeMap::new(),
            salespeople: Vec::new(),
            last_sync: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PersistedSettings {
    #[serde(default)]
    pub selected_server: Option<ServerSelection>,
}

pub async fn load_snapshot(path: &Path) -> PersistedSnapshot {
    match read_json::<PersistedSnapshot>(path).await {
        Some(snapshot) if snapshot.version == SNAPSHOT_VERSION => snapshot,
        Some(snapshot) => {
            tracing::warn!(
                "⚠️ Snapshot version {} not supported (expected {}), starting empty",
                snapshot.version,
                SNAPSHOT_VERSION
            );
            quarantine(path).await;
            PersistedSnapshot::default()
        }
        None => PersistedSnapshot::default(),
    }
}

pub async fn load_settings(path: &Path) -> PersistedSettings {
    read_json(path).await.unwrap_or_default()
}

/// Read and parse a JSON file; `None` when it is missing or corrupt.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("⚠️ Failed to read {}: {}, starting empty", path.display(), e);
            return None;
        }
    };

    match serde_json::from_slice(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("⚠️ Corrupt state file {}: {}, starting empty", path.display(), e);
            quarantine(path).await;
            None
        }
    }
}

async fn quarantine(path: &Path) {
    let target = with_suffix(path, "corrupt");
    if let Err(e) = tokio::fs::rename(path, &target).await {
        tracing::warn!("Could not move {} aside: {}", path.display(), e);
    }
}

/// Write `value` as pretty JSON via temp file + rename.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let content = serde_json::to_vec_pretty(value)?;
    let temp_path = with_suffix(path, "tmp");

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if let Err(e) = tokio::fs::write(&temp_path, content).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

pub async fn remove_if_exists(path: &Path) -> AppResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
