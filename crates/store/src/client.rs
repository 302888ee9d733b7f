//! Session store client wrapper.

use crate::config::StoreConfig;
use bridge_core::{DbErrorCode, Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Session store wrapper with connection pooling.
#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
    config: StoreConfig,
}

impl SessionStore {
    /// Connect and build the pool.
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(store_err)?
            .create_if_missing(true);

        // An in-memory database exists per connection; a larger pool would
        // hand each query a different empty database.
        let max_connections = if config.url.contains(":memory:") {
            1
        } else {
            config.pool_size
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(config.timeout_secs))
            .connect_with(options)
            .await
            .map_err(store_err)?;

        info!(url = %config.url, pool_size = max_connections, "Connected session store");

        Ok(Self { pool, config })
    }

    /// Returns the inner pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

/// Map a sqlx failure to the coded store error.
pub(crate) fn store_err(e: sqlx::Error) -> Error {
    Error::database(DbErrorCode::StoreFailed, e.to_string())
}
