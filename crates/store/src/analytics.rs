//! Session audit trail.
//!
//! One row per session, opened at login and closed exactly once at
//! revocation, expiry or cleanup. Rows are never deleted.

use chrono::{DateTime, Duration, Utc};
use sqlx::Row;
use uuid::Uuid;

use bridge_core::{
    device_type, ClientInfo, DecodedTokenPayload, Error, Result, Role, SessionAnalytics,
    ValidationErrorCode,
};

use crate::client::{store_err, SessionStore};

impl SessionStore {
    /// Open the audit row for a freshly created session.
    pub(crate) async fn open_analytics(
        &self,
        session_id: &str,
        payload: &DecodedTokenPayload,
        client_info: &ClientInfo,
        login_time: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO session_analytics (
                id, session_id, external_user_id, user_email, user_name, user_role,
                login_time, logout_time, duration, ip_address, user_agent, device_type
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, NULL, NULL, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(session_id)
        .bind(payload.external_user_id())
        .bind(&payload.profile.email)
        .bind(payload.display_name())
        .bind(payload.role().as_str())
        .bind(login_time)
        .bind(client_info.ip_address.as_deref())
        .bind(client_info.user_agent.as_deref())
        .bind(device_type(client_info.user_agent.as_deref()))
        .execute(self.pool())
        .await
        .map_err(store_err)?;

        Ok(())
    }

    /// Close the session's open audit row, if any.
    ///
    /// Duration is whole seconds from session creation to `logout_time`.
    /// The `logout_time IS NULL` guard makes repeated closes a no-op, so
    /// revocation followed by a cleanup sweep writes the end time once.
    /// Returns the number of rows closed (0 or 1).
    pub(crate) async fn close_open_analytics(
        &self,
        session_id: &str,
        logout_time: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Result<u64> {
        let duration = (logout_time - created_at).num_seconds();

        let result = sqlx::query(
            r#"
            UPDATE session_analytics
            SET logout_time = ?, duration = ?
            WHERE session_id = ? AND logout_time IS NULL
            "#,
        )
        .bind(logout_time)
        .bind(duration)
        .bind(session_id)
        .execute(self.pool())
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected())
    }

    /// Audit rows from the last `days` days, newest login first.
    /// Pass an external user id to scope the listing to one user.
    /// A `days` value the window arithmetic cannot represent is a
    /// validation error, not a panic.
    pub async fn get_session_analytics(
        &self,
        external_user_id: Option<&str>,
        days: i64,
    ) -> Result<Vec<SessionAnalytics>> {
        let since = Duration::try_days(days)
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .ok_or_else(|| {
                Error::validation_code(ValidationErrorCode::InvalidPayload, "days out of range")
            })?;

        let rows = match external_user_id {
            Some(user_id) => {
                sqlx::query(
                    r#"
                    SELECT * FROM session_analytics
                    WHERE external_user_id = ? AND login_time >= ?
                    ORDER BY login_time DESC
                    "#,
                )
                .bind(user_id)
                .bind(since)
                .fetch_all(self.pool())
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT * FROM session_analytics
                    WHERE login_time >= ?
                    ORDER BY login_time DESC
                    "#,
                )
                .bind(since)
                .fetch_all(self.pool())
                .await
            }
        }
        .map_err(store_err)?;

        rows.iter().map(row_to_analytics).collect()
    }
}

fn row_to_analytics(row: &sqlx::sqlite::SqliteRow) -> Result<SessionAnalytics> {
    Ok(SessionAnalytics {
        id: row.try_get("id").map_err(store_err)?,
        session_id: row.try_get("session_id").map_err(store_err)?,
        external_user_id: row.try_get("external_user_id").map_err(store_err)?,
        user_email: row.try_get("user_email").map_err(store_err)?,
        user_name: row.try_get("user_name").map_err(store_err)?,
        user_role: Role::parse(row.try_get::<String, _>("user_role").map_err(store_err)?.as_str()),
        login_time: row.try_get("login_time").map_err(store_err)?,
        logout_time: row.try_get("logout_time").map_err(store_err)?,
        duration: row.try_get("duration").map_err(store_err)?,
        ip_address: row.try_get("ip_address").map_err(store_err)?,
        user_agent: row.try_get("user_agent").map_err(store_err)?,
        device_type: row.try_get("device_type").map_err(store_err)?,
    })
}
