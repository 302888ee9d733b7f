//! Schema initialization for the session store.

use crate::client::{store_err, SessionStore};
use bridge_core::Result;
use tracing::info;

/// DDL statements, all idempotent.
///
/// `session_analytics.session_id` is intentionally not a foreign key:
/// the cleanup sweep purges old session rows while analytics rows are
/// retained indefinitely.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        session_token TEXT NOT NULL UNIQUE,
        external_user_id TEXT NOT NULL,
        user_email TEXT NOT NULL,
        user_name TEXT NOT NULL,
        user_role TEXT NOT NULL,
        expires TEXT NOT NULL,
        token_hash TEXT NOT NULL,
        ip_address TEXT,
        user_agent TEXT,
        device_info TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        revoked_at TEXT,
        revoked_by TEXT,
        revoke_reason TEXT,
        created_at TEXT NOT NULL,
        last_accessed TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_sessions_external_user ON sessions(external_user_id)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires)",
    r#"
    CREATE TABLE IF NOT EXISTS session_analytics (
        id TEXT PRIMARY KEY,
        session_id TEXT NOT NULL,
        external_user_id TEXT NOT NULL,
        user_email TEXT NOT NULL,
        user_name TEXT NOT NULL,
        user_role TEXT NOT NULL,
        login_time TEXT NOT NULL,
        logout_time TEXT,
        duration INTEGER,
        ip_address TEXT,
        user_agent TEXT,
        device_type TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_analytics_session ON session_analytics(session_id)",
    "CREATE INDEX IF NOT EXISTS idx_analytics_external_user ON session_analytics(external_user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
];

/// Initialize the session store schema. Safe to run repeatedly.
pub async fn init_schema(store: &SessionStore) -> Result<()> {
    for ddl in SCHEMA {
        sqlx::query(ddl)
            .execute(store.pool())
            .await
            .map_err(store_err)?;
    }

    info!("Session store schema initialized");
    Ok(())
}
