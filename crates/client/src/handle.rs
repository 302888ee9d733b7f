//! The client session state machine.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

use bridge_core::{hash_token, AuthenticatedUser, AuthErrorCode, ClientInfo, Error, Role};

use crate::config::AuthClientConfig;
use crate::storage::{
    TokenStorage, KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN, KEY_SESSION_TOKEN, KEY_USER_DATA,
};
use crate::wire::*;

/// Current authentication state.
#[derive(Debug, Clone)]
pub enum AuthState {
    /// Not yet hydrated from storage
    Loading,
    Unauthenticated,
    Authenticated {
        user: AuthenticatedUser,
        expires: DateTime<Utc>,
    },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// Client-side session handle.
///
/// Owns the token set in storage and mirrors the bridge's view of the
/// session. One handle per logical user session; clone the `Arc` to share
/// it with the background revalidation task.
pub struct AuthHandle {
    config: AuthClientConfig,
    http: reqwest::Client,
    storage: Arc<dyn TokenStorage>,
    state: RwLock<AuthState>,
}

impl AuthHandle {
    /// Build a handle and hydrate it from storage.
    ///
    /// A persisted snapshot that has already expired is discarded along
    /// with its tokens; the handle comes up unauthenticated rather than
    /// briefly trusting a dead session.
    pub fn new(config: AuthClientConfig, storage: Arc<dyn TokenStorage>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        let handle = Self {
            config,
            http,
            storage,
            state: RwLock::new(AuthState::Loading),
        };
        handle.hydrate();
        handle
    }

    fn hydrate(&self) {
        let snapshot = self
            .storage
            .get(KEY_USER_DATA)
            .and_then(|raw| serde_json::from_str::<StoredUser>(&raw).ok());
        let has_token = self.storage.get(KEY_SESSION_TOKEN).is_some();

        match snapshot {
            Some(stored) if has_token && stored.expires > Utc::now() => {
                *self.state.write() = AuthState::Authenticated {
                    user: stored.user,
                    expires: stored.expires,
                };
            }
            Some(_) | None => {
                if snapshot_exists(self.storage.as_ref()) {
                    debug!("Discarding stale session snapshot");
                }
                self.clear_local();
            }
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> AuthState {
        self.state.read().clone()
    }

    /// Currently authenticated user, if any.
    pub fn user(&self) -> Option<AuthenticatedUser> {
        match &*self.state.read() {
            AuthState::Authenticated { user, .. } => Some(user.clone()),
            _ => None,
        }
    }

    /// Hierarchical role check against the current user. UX gating only;
    /// the bridge re-checks on every protected call.
    pub fn has_role(&self, required: Role) -> bool {
        self.user().map_or(false, |u| u.role.satisfies(required))
    }

    /// Headers for authenticated calls to the application behind the
    /// bridge. Both headers are always present; absent values are empty
    /// strings, never omitted keys.
    pub fn auth_header(&self) -> [(&'static str, String); 2] {
        let access = self.storage.get(KEY_ACCESS_TOKEN).unwrap_or_default();
        let session = self.storage.get(KEY_SESSION_TOKEN).unwrap_or_default();

        let authorization = if access.is_empty() {
            String::new()
        } else {
            format!("Bearer {}", access)
        };

        [
            ("Authorization", authorization),
            ("X-Session-Token", session),
        ]
    }

    /// Run the full login handshake: external login, external decode,
    /// bridge create-session. Any credential rejection surfaces as the
    /// same generic error.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthenticatedUser, Error> {
        let login_url = format!("{}/api/auth_microservice/login/", self.config.auth_url);
        let response = self
            .http
            .post(&login_url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(transport_err)?;

        if !response.status().is_success() {
            return Err(Error::auth(
                AuthErrorCode::InvalidCredentials,
                "Invalid username or password",
            ));
        }

        let tokens: LoginResponse = response.json().await.map_err(transport_err)?;

        let decode_url = format!("{}/api/auth_microservice/decode-token/", self.config.auth_url);
        let decoded: DecodeResponse = self
            .http
            .post(&decode_url)
            .json(&DecodeRequest {
                token: &tokens.access,
            })
            .send()
            .await
            .map_err(transport_err)?
            .error_for_status()
            .map_err(transport_err)?
            .json()
            .await
            .map_err(transport_err)?;

        let create_url = format!("{}/auth/create-session", self.config.bridge_url);
        let created: CreateSessionResponse = self
            .http
            .post(&create_url)
            .json(&CreateSessionRequest {
                decoded_payload: &decoded.payload,
                access_token: &tokens.access,
                refresh_token: &tokens.refresh,
                client_info: ClientInfo::default(),
            })
            .send()
            .await
            .map_err(transport_err)?
            .error_for_status()
            .map_err(transport_err)?
            .json()
            .await
            .map_err(transport_err)?;

        self.storage.set(KEY_SESSION_TOKEN, &created.session_token);
        self.storage.set(KEY_ACCESS_TOKEN, &tokens.access);
        self.storage.set(KEY_REFRESH_TOKEN, &tokens.refresh);
        self.persist_snapshot(&created.user, created.expires);

        *self.state.write() = AuthState::Authenticated {
            user: created.user.clone(),
            expires: created.expires,
        };

        debug!(user_id = %created.user.id, "Login handshake complete");
        Ok(created.user)
    }

    /// Revalidate the session against the bridge.
    ///
    /// Sends the session token plus the digest of the held access token so
    /// the bridge can cross-check it. Any invalid outcome clears local
    /// state and returns false.
    pub async fn validate(&self) -> Result<bool, Error> {
        let (Some(session_token), Some(access)) = (
            self.storage.get(KEY_SESSION_TOKEN),
            self.storage.get(KEY_ACCESS_TOKEN),
        ) else {
            self.clear_local();
            return Ok(false);
        };

        let url = format!("{}/auth/validate-session", self.config.bridge_url);
        let response = self
            .http
            .post(&url)
            .json(&ValidateSessionRequest {
                session_token: &session_token,
                token_hash: &hash_token(&access),
            })
            .send()
            .await
            .map_err(transport_err)?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "Session no longer valid");
            self.clear_local();
            return Ok(false);
        }

        let validated: ValidateSessionResponse = response.json().await.map_err(transport_err)?;
        self.persist_snapshot(&validated.session.user, validated.session.expires);
        *self.state.write() = AuthState::Authenticated {
            user: validated.session.user,
            expires: validated.session.expires,
        };

        Ok(true)
    }

    /// Refresh the token pair via the bridge proxy.
    ///
    /// Updates the held tokens and the client-side expiry from the decoded
    /// claims. The bridge's stored session expiry is not extended; the next
    /// login re-aligns them. A failed refresh logs the session out.
    pub async fn refresh(&self) -> Result<(), Error> {
        let Some(refresh_token) = self.storage.get(KEY_REFRESH_TOKEN) else {
            self.logout("refresh-missing-token").await;
            return Err(Error::auth(
                AuthErrorCode::MissingToken,
                "No refresh token held",
            ));
        };

        let url = format!("{}/auth/refresh", self.config.bridge_url);
        let result = async {
            let response: RefreshResponse = self
                .http
                .post(&url)
                .json(&RefreshRequest {
                    refresh_token: &refresh_token,
                })
                .send()
                .await
                .map_err(transport_err)?
                .error_for_status()
                .map_err(|_| {
                    Error::auth(AuthErrorCode::InvalidCredentials, "Refresh token rejected")
                })?
                .json()
                .await
                .map_err(transport_err)?;
            Ok::<_, Error>(response)
        }
        .await;

        match result {
            Ok(refreshed) => {
                self.storage.set(KEY_ACCESS_TOKEN, &refreshed.access);
                self.storage.set(KEY_REFRESH_TOKEN, &refreshed.refresh);

                let expires = DateTime::<Utc>::from_timestamp(refreshed.decoded.exp, 0)
                    .unwrap_or_else(Utc::now);
                if let Some(user) = self.user() {
                    self.persist_snapshot(&user, expires);
                    *self.state.write() = AuthState::Authenticated { user, expires };
                }
                debug!("Token pair refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Refresh failed, logging out");
                self.logout("refresh-failed").await;
                Err(e)
            }
        }
    }

    /// Log out: best-effort revoke at the bridge, then unconditional local
    /// clear. Network failures never leave the client logged in.
    pub async fn logout(&self, reason: &str) {
        if let Some(session_token) = self.storage.get(KEY_SESSION_TOKEN) {
            let url = format!("{}/auth/logout", self.config.bridge_url);
            let result = self
                .http
                .post(&url)
                .json(&LogoutRequest {
                    session_token: &session_token,
                    reason,
                })
                .send()
                .await;
            if let Err(e) = result {
                warn!(error = %e, "Logout request failed, clearing locally");
            }
        }

        self.clear_local();
    }

    /// Spawn the periodic revalidation task.
    ///
    /// Each tick revalidates the session, refreshes when inside the
    /// refresh window, and logs out when the expiry has already passed.
    pub fn spawn_revalidation(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let handle = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(handle.config.revalidate_interval);
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                handle.revalidation_tick().await;
            }
        })
    }

    async fn revalidation_tick(&self) {
        if !self.state.read().is_authenticated() {
            return;
        }

        if let Err(e) = self.validate().await {
            warn!(error = %e, "Revalidation call failed");
            return;
        }

        let expires = match &*self.state.read() {
            AuthState::Authenticated { expires, .. } => *expires,
            _ => return,
        };

        let remaining = expires - Utc::now();
        if remaining <= chrono::Duration::zero() {
            self.logout("expired").await;
        } else if remaining.to_std().unwrap_or_default() < self.config.refresh_window {
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "Scheduled refresh failed");
            }
        }
    }

    fn persist_snapshot(&self, user: &AuthenticatedUser, expires: DateTime<Utc>) {
        let stored = StoredUser {
            user: user.clone(),
            expires,
        };
        if let Ok(raw) = serde_json::to_string(&stored) {
            self.storage.set(KEY_USER_DATA, &raw);
        }
    }

    fn clear_local(&self) {
        self.storage.remove(KEY_SESSION_TOKEN);
        self.storage.remove(KEY_ACCESS_TOKEN);
        self.storage.remove(KEY_REFRESH_TOKEN);
        self.storage.remove(KEY_USER_DATA);
        *self.state.write() = AuthState::Unauthenticated;
    }
}

fn snapshot_exists(storage: &dyn TokenStorage) -> bool {
    storage.get(KEY_USER_DATA).is_some()
}

fn transport_err(e: reqwest::Error) -> Error {
    let message = if e.is_timeout() {
        "Auth request timed out"
    } else {
        "Auth service unavailable"
    };
    Error::auth(AuthErrorCode::UpstreamUnavailable, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::Duration;

    fn stored_user(role: Role, expires: DateTime<Utc>) -> String {
        serde_json::to_string(&StoredUser {
            user: AuthenticatedUser {
                id: "42".into(),
                email: "kago@example.com".into(),
                name: "Kago Moremi".into(),
                role,
            },
            expires,
        })
        .unwrap()
    }

    fn handle_with(storage: Arc<MemoryStorage>) -> AuthHandle {
        AuthHandle::new(AuthClientConfig::default(), storage)
    }

    #[test]
    fn test_hydrates_valid_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(KEY_SESSION_TOKEN, "tok");
        storage.set(KEY_ACCESS_TOKEN, "acc");
        storage.set(
            KEY_USER_DATA,
            &stored_user(Role::Agent, Utc::now() + Duration::hours(1)),
        );

        let handle = handle_with(storage);
        assert!(handle.state().is_authenticated());
        assert_eq!(handle.user().unwrap().id, "42");
    }

    #[test]
    fn test_discards_expired_snapshot_and_clears_storage() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(KEY_SESSION_TOKEN, "tok");
        storage.set(
            KEY_USER_DATA,
            &stored_user(Role::Agent, Utc::now() - Duration::minutes(1)),
        );

        let handle = handle_with(Arc::clone(&storage));
        assert!(!handle.state().is_authenticated());
        assert!(storage.get(KEY_SESSION_TOKEN).is_none());
        assert!(storage.get(KEY_USER_DATA).is_none());
    }

    #[test]
    fn test_snapshot_without_session_token_is_discarded() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(
            KEY_USER_DATA,
            &stored_user(Role::Agent, Utc::now() + Duration::hours(1)),
        );

        let handle = handle_with(storage);
        assert!(!handle.state().is_authenticated());
    }

    #[test]
    fn test_auth_header_empty_strings_when_logged_out() {
        let handle = handle_with(Arc::new(MemoryStorage::new()));
        let [(auth_name, auth_value), (session_name, session_value)] = handle.auth_header();

        assert_eq!(auth_name, "Authorization");
        assert_eq!(auth_value, "");
        assert_eq!(session_name, "X-Session-Token");
        assert_eq!(session_value, "");
    }

    #[test]
    fn test_auth_header_bearer_format() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(KEY_ACCESS_TOKEN, "acc-1");
        storage.set(KEY_SESSION_TOKEN, "sess-1");

        let handle = handle_with(storage);
        let [(_, auth_value), (_, session_value)] = handle.auth_header();
        assert_eq!(auth_value, "Bearer acc-1");
        assert_eq!(session_value, "sess-1");
    }

    #[test]
    fn test_has_role_is_hierarchical() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(KEY_SESSION_TOKEN, "tok");
        storage.set(
            KEY_USER_DATA,
            &stored_user(Role::Supervisor, Utc::now() + Duration::hours(1)),
        );

        let handle = handle_with(storage);
        assert!(handle.has_role(Role::Viewer));
        assert!(handle.has_role(Role::Supervisor));
        assert!(!handle.has_role(Role::Admin));
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_bridge_unreachable() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(KEY_SESSION_TOKEN, "tok");
        storage.set(KEY_ACCESS_TOKEN, "acc");
        storage.set(
            KEY_USER_DATA,
            &stored_user(Role::Agent, Utc::now() + Duration::hours(1)),
        );

        let config = AuthClientConfig {
            bridge_url: "http://127.0.0.1:9".to_string(),
            ..AuthClientConfig::default()
        };
        let handle = AuthHandle::new(config, storage.clone() as Arc<dyn TokenStorage>);
        assert!(handle.state().is_authenticated());

        handle.logout("test").await;

        assert!(!handle.state().is_authenticated());
        assert!(storage.get(KEY_SESSION_TOKEN).is_none());
        assert!(storage.get(KEY_ACCESS_TOKEN).is_none());
    }
}
