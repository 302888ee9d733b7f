//! Session lifecycle operations.
//!
//! Validity invariant: a session is returned by validation iff
//! `is_active AND expires > now`. Not-found, expired and revoked all
//! collapse to `None` so callers cannot tell them apart.

use chrono::{DateTime, Duration, Utc};
use sqlx::Row;
use tracing::warn;
use uuid::Uuid;

use bridge_core::{
    device_info, hash_token, CreatedSession, ClientInfo, DecodedTokenPayload, Result, Role,
    Session, SessionSummary,
};

use crate::client::{store_err, SessionStore};

/// Counts reported by a cleanup sweep, for logging and idempotence checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupOutcome {
    /// Open analytics rows closed in phase 1
    pub analytics_closed: u64,
    /// Expired-but-active sessions flipped inactive in phase 1
    pub sessions_deactivated: u64,
    /// Session rows hard-deleted in phase 2
    pub sessions_purged: u64,
}

impl SessionStore {
    /// Mint a local session from a decoded external identity.
    ///
    /// The session row is written first; the analytics row references its
    /// id and is best-effort, so a failed analytics write is logged and the
    /// session stands. The refresh token is never persisted; only the
    /// access token's digest is kept for the optional integrity check.
    pub async fn create_session(
        &self,
        payload: &DecodedTokenPayload,
        access_token: &str,
        _refresh_token: &str,
        client_info: &ClientInfo,
    ) -> Result<CreatedSession> {
        let now = Utc::now();
        let session_id = Uuid::new_v4().to_string();
        let session_token = Uuid::new_v4().to_string();
        let token_hash = hash_token(access_token);
        let expires = DateTime::<Utc>::from_timestamp(payload.exp, 0)
            .unwrap_or_else(|| now - Duration::seconds(1));
        let external_user_id = payload.external_user_id();
        let user_name = payload.display_name();
        let user_role = payload.role();

        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, session_token, external_user_id, user_email, user_name, user_role,
                expires, token_hash, ip_address, user_agent, device_info,
                is_active, revoked_at, revoked_by, revoke_reason, created_at, last_accessed
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, NULL, NULL, NULL, ?, ?)
            "#,
        )
        .bind(&session_id)
        .bind(&session_token)
        .bind(&external_user_id)
        .bind(&payload.profile.email)
        .bind(&user_name)
        .bind(user_role.as_str())
        .bind(expires)
        .bind(&token_hash)
        .bind(client_info.ip_address.as_deref())
        .bind(client_info.user_agent.as_deref())
        .bind(device_info(client_info.user_agent.as_deref()))
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(store_err)?;

        if let Err(e) = self
            .open_analytics(&session_id, payload, client_info, now)
            .await
        {
            // Session state is authoritative; audit completeness is not.
            warn!(session_id = %session_id, error = %e, "Analytics write failed for new session");
        }

        Ok(CreatedSession {
            session_id,
            session_token,
            user: bridge_core::AuthenticatedUser {
                id: external_user_id,
                email: payload.profile.email.clone(),
                name: user_name,
                role: user_role,
            },
            expires,
        })
    }

    /// Resolve a session token to its identity snapshot.
    ///
    /// Returns `None` for unknown, inactive or expired sessions, and for a
    /// token-hash mismatch when a hash is supplied (a session token replayed
    /// with a stale or foreign access token). On success `last_accessed` is
    /// bumped; a failure there is logged and never blocks the result.
    pub async fn validate_session(
        &self,
        session_token: &str,
        token_hash: Option<&str>,
    ) -> Result<Option<SessionSummary>> {
        let Some(session) = self.find_by_token(session_token).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if !session.is_valid(now) {
            return Ok(None);
        }

        if let Some(hash) = token_hash {
            if hash != session.token_hash {
                return Ok(None);
            }
        }

        let touched = sqlx::query("UPDATE sessions SET last_accessed = ? WHERE id = ?")
            .bind(now)
            .bind(&session.id)
            .execute(self.pool())
            .await;
        if let Err(e) = touched {
            warn!(session_id = %session.id, error = %e, "Failed to bump last_accessed");
        }

        Ok(Some(SessionSummary {
            session_id: session.id.clone(),
            user: session.user(),
            expires: session.expires,
        }))
    }

    /// Revoke one session and close its open analytics record.
    ///
    /// Idempotent: re-revoking re-applies the metadata, last write wins.
    /// Concurrent revokes of the same session are a benign race; no
    /// locking is taken. Returns whether an active session was actually
    /// flipped, so callers can tell a real revocation from a re-revoke
    /// or an unknown token.
    pub async fn revoke_session(
        &self,
        session_token: &str,
        revoked_by: Option<&str>,
        reason: Option<&str>,
    ) -> Result<bool> {
        let now = Utc::now();
        let session = self.find_by_token(session_token).await?;

        sqlx::query(
            r#"
            UPDATE sessions
            SET is_active = 0, revoked_at = ?, revoked_by = ?, revoke_reason = ?
            WHERE session_token = ?
            "#,
        )
        .bind(now)
        .bind(revoked_by)
        .bind(reason)
        .bind(session_token)
        .execute(self.pool())
        .await
        .map_err(store_err)?;

        let Some(session) = session else {
            return Ok(false);
        };
        self.close_open_analytics(&session.id, now, session.created_at)
            .await?;

        Ok(session.is_active)
    }

    /// Phase 1 of the bulk revoke: the sessions that would be affected.
    ///
    /// Split out so the phases are independently testable and a failure
    /// between them is a visible state, not hidden control flow.
    pub async fn select_active_sessions(&self, external_user_id: &str) -> Result<Vec<Session>> {
        let rows = sqlx::query(
            "SELECT * FROM sessions WHERE external_user_id = ? AND is_active = 1",
        )
        .bind(external_user_id)
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;

        rows.iter().map(row_to_session).collect()
    }

    /// Revoke every currently-active session for a user. Returns how many
    /// sessions were revoked.
    ///
    /// Two-phase: enumerate first (to know which analytics rows to close),
    /// then bulk-update, then close analytics per session. A createSession
    /// racing this call may survive; accepted, last writer wins.
    pub async fn revoke_all_user_sessions(
        &self,
        external_user_id: &str,
        revoked_by: Option<&str>,
        reason: Option<&str>,
    ) -> Result<u64> {
        let sessions = self.select_active_sessions(external_user_id).await?;
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE sessions
            SET is_active = 0, revoked_at = ?, revoked_by = ?, revoke_reason = ?
            WHERE external_user_id = ? AND is_active = 1
            "#,
        )
        .bind(now)
        .bind(revoked_by)
        .bind(reason)
        .bind(external_user_id)
        .execute(self.pool())
        .await
        .map_err(store_err)?;

        for session in &sessions {
            self.close_open_analytics(&session.id, now, session.created_at)
                .await?;
        }

        Ok(sessions.len() as u64)
    }

    /// Active, unexpired sessions for a user, most recently used first.
    pub async fn get_user_active_sessions(&self, external_user_id: &str) -> Result<Vec<Session>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM sessions
            WHERE external_user_id = ? AND is_active = 1 AND expires > ?
            ORDER BY last_accessed DESC
            "#,
        )
        .bind(external_user_id)
        .bind(Utc::now())
        .fetch_all(self.pool())
        .await
        .map_err(store_err)?;

        rows.iter().map(row_to_session).collect()
    }

    /// Sweep expired and revoked sessions.
    ///
    /// Phase 1 closes dangling analytics rows (logout time is the revocation
    /// time if revoked, otherwise the expiry) and flips expired-but-active
    /// sessions inactive so they age into the purge window. Phase 2
    /// hard-deletes inactive session rows past the retention window.
    /// Analytics rows are never deleted. Running it twice in a row is a
    /// no-op the second time.
    pub async fn cleanup_expired_sessions(&self) -> Result<CleanupOutcome> {
        let now = Utc::now();
        let mut outcome = CleanupOutcome::default();

        // Phase 1: dead sessions (expired or revoked)
        let rows = sqlx::query("SELECT * FROM sessions WHERE expires < ? OR is_active = 0")
            .bind(now)
            .fetch_all(self.pool())
            .await
            .map_err(store_err)?;
        let dead: Vec<Session> = rows
            .iter()
            .map(row_to_session)
            .collect::<Result<Vec<_>>>()?;

        for session in &dead {
            if session.is_active {
                sqlx::query("UPDATE sessions SET is_active = 0 WHERE id = ?")
                    .bind(&session.id)
                    .execute(self.pool())
                    .await
                    .map_err(store_err)?;
                outcome.sessions_deactivated += 1;
            }

            let logout_time = session.revoked_at.unwrap_or(session.expires);
            outcome.analytics_closed += self
                .close_open_analytics(&session.id, logout_time, session.created_at)
                .await?;
        }

        // Phase 2: purge inactive rows past the retention window
        let cutoff = now - Duration::days(self.config().retention_days);
        let purged = sqlx::query("DELETE FROM sessions WHERE created_at < ? AND is_active = 0")
            .bind(cutoff)
            .execute(self.pool())
            .await
            .map_err(store_err)?;
        outcome.sessions_purged = purged.rows_affected();

        Ok(outcome)
    }

    async fn find_by_token(&self, session_token: &str) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT * FROM sessions WHERE session_token = ?")
            .bind(session_token)
            .fetch_optional(self.pool())
            .await
            .map_err(store_err)?;

        row.as_ref().map(row_to_session).transpose()
    }
}

/// Map a sessions row into the domain record.
pub(crate) fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<Session> {
    Ok(Session {
        id: row.try_get("id").map_err(store_err)?,
        session_token: row.try_get("session_token").map_err(store_err)?,
        external_user_id: row.try_get("external_user_id").map_err(store_err)?,
        user_email: row.try_get("user_email").map_err(store_err)?,
        user_name: row.try_get("user_name").map_err(store_err)?,
        user_role: Role::parse(row.try_get::<String, _>("user_role").map_err(store_err)?.as_str()),
        expires: row.try_get("expires").map_err(store_err)?,
        token_hash: row.try_get("token_hash").map_err(store_err)?,
        ip_address: row.try_get("ip_address").map_err(store_err)?,
        user_agent: row.try_get("user_agent").map_err(store_err)?,
        device_info: row.try_get("device_info").map_err(store_err)?,
        is_active: row.try_get("is_active").map_err(store_err)?,
        revoked_at: row.try_get("revoked_at").map_err(store_err)?,
        revoked_by: row.try_get("revoked_by").map_err(store_err)?,
        revoke_reason: row.try_get("revoke_reason").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        last_accessed: row.try_get("last_accessed").map_err(store_err)?,
    })
}
