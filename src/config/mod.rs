use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::data::source::{DatasetLocation, FetchError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Settings of one dashboard instance, handed to the loader at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Session storage key holding the normalized snapshot.
    pub storage_key: String,
    /// Resource fetched automatically on the first load of a session.
    pub default_source: String,
    /// Page base the default source is resolved against: a URL or a directory.
    pub base_location: String,
    pub fetch_timeout_secs: u64,
    pub session_dir: PathBuf,
    pub cache_quota_bytes: Option<usize>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            storage_key: "quantum_r_data_v2".to_string(),
            default_source: "final_dashboard_data.csv".to_string(),
            base_location: ".".to_string(),
            fetch_timeout_secs: 15,
            session_dir: std::env::temp_dir().join("risk-dashboard-session"),
            cache_quota_bytes: None,
        }
    }
}

impl DashboardConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: DashboardConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn default_location(&self) -> Result<DatasetLocation, FetchError> {
        DatasetLocation::resolve(&self.base_location, &self.default_source)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
