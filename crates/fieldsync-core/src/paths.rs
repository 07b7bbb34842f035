//! Path utilities for local data storage.

use std::fs;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Directory name for data storage.
pub const DATA_DIR: &str = ".fieldsync";
/// Filename for the sync configuration.
pub const CONFIG_FILE: &str = "fieldsync_config.json";
/// Filename for persisted settings (server selection).
pub const SETTINGS_FILE: &str = "settings.json";
/// Filename for the entity snapshot.
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// Get the data directory path.
///
/// Priority:
/// 1. `FIELDSYNC_DATA_DIR` environment variable
/// 2. `~/.fieldsync`
pub fn get_data_dir() -> AppResult<PathBuf> {
    let data_dir = if let Ok(custom_dir) = std::env::var("FIELDSYNC_DATA_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("Cannot get home directory".to_string()))?;
        home.join(DATA_DIR)
    };

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)?;
    }

    Ok(data_dir)
}
