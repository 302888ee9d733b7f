//! Session store configuration.

use serde::{Deserialize, Serialize};

/// Session store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite connection URL
    pub url: String,
    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// Query timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retention window for purged session rows, in days
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

fn default_pool_size() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retention_days() -> i64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://sessions.db".to_string(),
            pool_size: default_pool_size(),
            timeout_secs: default_timeout_secs(),
            retention_days: default_retention_days(),
        }
    }
}

impl StoreConfig {
    /// In-memory store, used by tests.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            ..Self::default()
        }
    }
}
