//! Application state shared across handlers.

use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter, SharedRateLimiter};
use bridge_core::{AuthErrorCode, DecodedTokenPayload, Error, Profile, TokenPair};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use session_store::SessionStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::metrics;
use tracing::{debug, warn};

/// Timeout for external auth microservice calls.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the external auth microservice.
///
/// The microservice owns credentials and token issuance; this client only
/// drives the login, decode and refresh endpoints. No retries: a failed
/// call surfaces immediately as AUTH_003 (rejected) or AUTH_004
/// (unreachable or timed out).
#[derive(Clone)]
pub struct ExternalAuthClient {
    /// Auth microservice base URL (e.g., "http://auth-service:8000")
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
    /// Whether to use mock mode (for testing)
    mock_mode: bool,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct DecodeRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct DecodeResponse {
    payload: DecodedTokenPayload,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

impl ExternalAuthClient {
    /// Creates a new auth client.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let mock_mode = base_url.is_empty() || base_url == "mock";

        Self {
            base_url,
            http_client: reqwest::Client::builder()
                .timeout(UPSTREAM_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            mock_mode,
        }
    }

    /// Exchange credentials for a token pair.
    ///
    /// Any upstream rejection maps to a generic invalid-credentials error;
    /// the upstream's reason is logged server-side only.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, Error> {
        if self.mock_mode {
            return Ok(self.mock_login(username));
        }

        let url = format!("{}/api/auth_microservice/login/", self.base_url);
        let start = Instant::now();
        metrics().upstream_auth_calls.inc();

        debug!(url = %url, "Calling auth login");

        let response = self
            .http_client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(upstream_err)?;

        metrics()
            .upstream_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Auth login rejected");
            metrics().upstream_auth_failures.inc();
            return Err(Error::auth(
                AuthErrorCode::InvalidCredentials,
                "Invalid username or password",
            ));
        }

        let pair: TokenPair = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse login response");
            Error::auth(AuthErrorCode::UpstreamUnavailable, "Invalid auth response")
        })?;

        Ok(pair)
    }

    /// Decode an access token into its identity claims.
    pub async fn decode(&self, access_token: &str) -> Result<DecodedTokenPayload, Error> {
        if self.mock_mode {
            return Ok(mock_payload(access_token));
        }

        let url = format!("{}/api/auth_microservice/decode-token/", self.base_url);
        let start = Instant::now();
        metrics().upstream_auth_calls.inc();

        let response = self
            .http_client
            .post(&url)
            .json(&DecodeRequest {
                token: access_token,
            })
            .send()
            .await
            .map_err(upstream_err)?;

        metrics()
            .upstream_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        if !response.status().is_success() {
            let status = response.status();
            warn!(status = %status, "Token decode rejected");
            metrics().upstream_auth_failures.inc();
            return Err(Error::auth(
                AuthErrorCode::UpstreamUnavailable,
                "Failed to decode token",
            ));
        }

        let decoded: DecodeResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse decode response");
            Error::auth(AuthErrorCode::UpstreamUnavailable, "Invalid decode response")
        })?;

        Ok(decoded.payload)
    }

    /// Trade a refresh token for a fresh token pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, Error> {
        if self.mock_mode {
            return Ok(self.mock_login("refreshed"));
        }

        let url = format!("{}/api/auth_microservice/refresh/", self.base_url);
        let start = Instant::now();
        metrics().upstream_auth_calls.inc();

        let response = self
            .http_client
            .post(&url)
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await
            .map_err(upstream_err)?;

        metrics()
            .upstream_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        if !response.status().is_success() {
            let status = response.status();
            warn!(status = %status, "Token refresh rejected");
            metrics().upstream_auth_failures.inc();
            return Err(Error::auth(
                AuthErrorCode::InvalidCredentials,
                "Refresh token rejected",
            ));
        }

        let pair: TokenPair = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse refresh response");
            Error::auth(AuthErrorCode::UpstreamUnavailable, "Invalid auth response")
        })?;

        Ok(pair)
    }

    /// Reachability probe for startup health reporting. Any HTTP response
    /// counts as reachable; only transport failures do not.
    pub async fn ping(&self) -> bool {
        if self.mock_mode {
            return true;
        }

        self.http_client.get(&self.base_url).send().await.is_ok()
    }

    /// Mock login for testing/development.
    fn mock_login(&self, username: &str) -> TokenPair {
        debug!("Using mock auth login");
        TokenPair {
            access: format!("mock-access-{}", username),
            refresh: format!("mock-refresh-{}", username),
        }
    }
}

/// Map a transport failure to the upstream error, keeping timeouts
/// distinguishable in the message.
fn upstream_err(e: reqwest::Error) -> Error {
    warn!(error = %e, "Auth service request failed");
    metrics().upstream_auth_failures.inc();
    let message = if e.is_timeout() {
        "Auth service timed out"
    } else {
        "Auth service unavailable"
    };
    Error::auth(AuthErrorCode::UpstreamUnavailable, message)
}

/// Deterministic mock identity derived from the access token.
/// This is for testing only - in production the decode endpoint provides it.
fn mock_payload(access_token: &str) -> DecodedTokenPayload {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    access_token.hash(&mut hasher);
    let user_id = (hasher.finish() % 9_000 + 1_000) as i64;

    DecodedTokenPayload {
        user_id,
        exp: (Utc::now() + chrono::Duration::hours(8)).timestamp(),
        roles: vec!["agent".into()],
        profile: Profile {
            username: format!("mock-user-{}", user_id),
            first_name: "Mock".into(),
            last_name: "User".into(),
            email: format!("mock-{}@example.com", user_id),
        },
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Session store
    pub store: Arc<SessionStore>,
    /// External auth microservice client
    pub auth: ExternalAuthClient,
    /// Rate limiter for session-minting endpoints
    pub rate_limiter: SharedRateLimiter,
}

impl AppState {
    pub fn new(store: Arc<SessionStore>, auth_url: impl Into<String>) -> Self {
        Self {
            store,
            auth: ExternalAuthClient::new(auth_url),
            rate_limiter: Arc::new(RateLimiter::new(RateLimitConfig::default())),
        }
    }

    /// Create with custom rate limit config.
    pub fn with_rate_limit(
        store: Arc<SessionStore>,
        auth_url: impl Into<String>,
        rate_config: RateLimitConfig,
    ) -> Self {
        Self {
            store,
            auth: ExternalAuthClient::new(auth_url),
            rate_limiter: Arc::new(RateLimiter::new(rate_config)),
        }
    }

    /// Start the rate limiter cleanup background task.
    /// Returns a handle that can be used to cancel the task.
    pub fn start_rate_limiter_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let rate_limiter = self.rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                rate_limiter.cleanup_stale(Duration::from_secs(600));
            }
        })
    }
}
