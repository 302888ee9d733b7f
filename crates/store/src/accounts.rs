//! Local account shadow rows.
//!
//! Accounts mirror the external identity for features that need a stable
//! local row (preferences, attribution). They carry no credentials and
//! play no part in authorization.

use chrono::Utc;

use bridge_core::{AuthenticatedUser, Result};

use crate::client::{store_err, SessionStore};

impl SessionStore {
    /// Insert or refresh the shadow account for an authenticated user.
    /// Email and name follow the latest decoded identity.
    pub async fn upsert_account(&self, user: &AuthenticatedUser) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                name = excluded.name,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(store_err)?;

        Ok(())
    }

    /// Look up a shadow account's (email, name), if it exists.
    pub async fn get_account(&self, external_user_id: &str) -> Result<Option<(String, String)>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT email, name FROM accounts WHERE id = ?")
                .bind(external_user_id)
                .fetch_optional(self.pool())
                .await
                .map_err(store_err)?;

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::schema::init_schema;
    use bridge_core::Role;

    async fn test_store() -> SessionStore {
        let store = SessionStore::connect(StoreConfig::in_memory())
            .await
            .expect("connect in-memory store");
        init_schema(&store).await.expect("init schema");
        store
    }

    fn user(id: &str, email: &str, name: &str) -> AuthenticatedUser {
        AuthenticatedUser {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            role: Role::Agent,
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let store = test_store().await;

        store
            .upsert_account(&user("42", "old@example.com", "Old Name"))
            .await
            .unwrap();
        assert_eq!(
            store.get_account("42").await.unwrap(),
            Some(("old@example.com".into(), "Old Name".into()))
        );

        // Re-login with refreshed claims updates in place
        store
            .upsert_account(&user("42", "new@example.com", "New Name"))
            .await
            .unwrap();
        assert_eq!(
            store.get_account("42").await.unwrap(),
            Some(("new@example.com".into(), "New Name".into()))
        );
    }

    #[tokio::test]
    async fn test_missing_account_is_none() {
        let store = test_store().await;
        assert!(store.get_account("77").await.unwrap().is_none());
    }
}
