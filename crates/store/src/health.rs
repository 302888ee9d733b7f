//! Store connectivity probe.

use bridge_core::Result;

use crate::client::{store_err, SessionStore};

/// Round-trip a trivial query to confirm the pool can reach the database.
pub async fn check_connection(store: &SessionStore) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(store.pool())
        .await
        .map_err(store_err)?;
    Ok(())
}
