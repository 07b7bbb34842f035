//! Sync configuration: candidate list, API key, timeouts.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use fieldsync_client::ClientConfig;
use fieldsync_types::{ServerCandidate, Transport};

use crate::error::AppResult;
use crate::paths::CONFIG_FILE;

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "FIELDSYNC_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub candidates: Vec<ServerCandidate>,
    pub api_key: String,
    pub api_base_path: String,
    pub probe_timeout_ms: u64,
    pub fetch_timeout_ms: u64,
    /// Fire `POST /sync` after a refresh that applied new data.
    pub server_sync_after_refresh: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            candidates: default_candidates(),
            api_key: String::new(),
            api_base_path: "/api".to_string(),
            probe_timeout_ms: 4_000,
            fetch_timeout_ms: 15_000,
            server_sync_after_refresh: true,
        }
    }
}

impl SyncConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_key: self.api_key.clone(),
            api_base_path: self.api_base_path.clone(),
            probe_timeout: self.probe_timeout(),
            request_timeout: self.fetch_timeout(),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api_key = key;
            }
        }
    }
}

/// Cloud first, then the desk machine on the LAN, then the same machine via
/// port forwarding, then loopback for development.
pub fn default_candidates() -> Vec<ServerCandidate> {
    vec![
        ServerCandidate::new("primary cloud", "api.fieldsync.app", 443, Transport::Https, 0),
        ServerCandidate::new("local network", "192.168.1.50", 5001, Transport::Http, 1),
        ServerCandidate::new("public internet", "fieldsync-desk.duckdns.org", 5001, Transport::Http, 2),
        ServerCandidate::new("loopback", "127.0.0.1", 5001, Transport::Http, 3),
    ]
}

/// Load the sync configuration from `data_dir`, falling back to defaults
/// when the file does not exist.
pub fn load_config(data_dir: &Path) -> AppResult<SyncConfig> {
    let config_path = data_dir.join(CONFIG_FILE);

    let mut config = if config_path.exists() {
        let content = fs::read_to_string(&config_path)?;
        serde_json::from_str(&content)?
    } else {
        SyncConfig::default()
    };

    config.apply_env_overrides();
    Ok(config)
}

/// Save the sync configuration atomically.
pub fn save_config(data_dir: &Path, config: &SyncConfig) -> AppResult<()> {
    let config_path = data_dir.join(CONFIG_FILE);
    let temp_path = data_dir.join(format!("{}.tmp", CONFIG_FILE));

    let content = serde_json::to_string_pretty(config)?;

    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, &config_path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        e.into()
    })
}
