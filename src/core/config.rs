//! Store configuration loaded from `<root>/fleetstore.toml`.
//!
//! A missing file is not an error: every field falls back to its default.

use crate::core::error::FleetError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "fleetstore.toml";

/// SQLite rejects statements with more than 32766 bound parameters.
pub const SQLITE_MAX_PARAMS: usize = 32_766;

/// Upper bound for `host_batch_size`, leaving room for the label id and timestamp.
pub const MAX_HOST_BATCH_SIZE: usize = 30_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hard cap on payload-bearing result rows retained per query.
    pub max_query_report_rows: usize,
    /// Host names per membership insert when replacing manual label lists.
    pub host_batch_size: usize,
    pub busy_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Append one line per write operation to `broker.events.jsonl`.
    pub audit_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_query_report_rows: 1000,
            host_batch_size: 10_000,
            busy_timeout_ms: 5_000,
            max_retries: 5,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 5_000,
            audit_log: true,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), FleetError> {
        if self.host_batch_size == 0 || self.host_batch_size > MAX_HOST_BATCH_SIZE {
            return Err(FleetError::ValidationError(format!(
                "host_batch_size must be in 1..={}, got {}",
                MAX_HOST_BATCH_SIZE, self.host_batch_size
            )));
        }
        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            return Err(FleetError::ValidationError(format!(
                "retry_base_delay_ms ({}) exceeds retry_max_delay_ms ({})",
                self.retry_base_delay_ms, self.retry_max_delay_ms
            )));
        }
        Ok(())
    }
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

/// Load config from the store root; absent file means defaults.
pub fn load_config(root: &Path) -> Result<Config, FleetError> {
    let path = config_path(root);
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(&path).map_err(FleetError::IoError)?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| FleetError::ConfigError(format!("{}: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}
