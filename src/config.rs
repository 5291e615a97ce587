//! Engine configuration
//!
//! Resolution order: built-in defaults, then `.env` / process environment,
//! then whatever the caller (usually the CLI) overrides explicitly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_PRODUCTION_FILE: &str = "normalized_production_2018_19.csv";
pub const DEFAULT_RAINFALL_FILE: &str = "normalized_rainfall_2018_19.csv";
pub const DEFAULT_STATION_MAP_FILE: &str = "station_to_state.csv";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory holding the local CSV files
    pub data_dir: PathBuf,
    pub production_file: String,
    pub rainfall_file: String,
    /// Optional `station_substring,state` table; absent file means heuristics only
    pub station_map_file: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            production_file: DEFAULT_PRODUCTION_FILE.to_string(),
            rainfall_file: DEFAULT_RAINFALL_FILE.to_string(),
            station_map_file: DEFAULT_STATION_MAP_FILE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Build a config from `SAMARTH_*` environment variables, loading `.env` first.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(dir) = lookup("SAMARTH_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(file) = lookup("SAMARTH_PRODUCTION_FILE").filter(|v| !v.trim().is_empty()) {
            config.production_file = file.trim().to_string();
        }
        if let Some(file) = lookup("SAMARTH_RAINFALL_FILE").filter(|v| !v.trim().is_empty()) {
            config.rainfall_file = file.trim().to_string();
        }
        if let Some(file) = lookup("SAMARTH_STATION_MAP_FILE").filter(|v| !v.trim().is_empty()) {
            config.station_map_file = file.trim().to_string();
        }
        config
    }

    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn production_path(&self) -> PathBuf {
        self.data_dir.join(&self.production_file)
    }

    pub fn rainfall_path(&self) -> PathBuf {
        self.data_dir.join(&self.rainfall_file)
    }

    pub fn station_map_path(&self) -> PathBuf {
        self.data_dir.join(&self.station_map_file)
    }

    /// Logical identifier cited in provenance instead of a filesystem path.
    pub fn production_source(&self) -> String {
        logical_source(&self.production_file)
    }

    pub fn rainfall_source(&self) -> String {
        logical_source(&self.rainfall_file)
    }
}

/// `local://data/<file name>` for a configured file.
pub fn logical_source(file: &str) -> String {
    let name = Path::new(file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file);
    format!("local://data/{}", name)
}
