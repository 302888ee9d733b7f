//! Request extractors.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{DateTime, Utc};

use bridge_core::AuthenticatedUser;

use crate::state::AppState;

/// Cookie carrying the bridged session token.
pub const SESSION_COOKIE: &str = "session-token";

/// Authenticated context resolved from the session cookie.
///
/// Extraction never rejects: an absent or invalid session yields an
/// unauthenticated context and the handler decides whether that is an
/// error. When no token is presented the store is not consulted at all.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Identity snapshot when the session validated
    pub user: Option<AuthenticatedUser>,
    /// Session row id for the validated session
    pub session_id: Option<String>,
    /// Session expiry for the validated session
    pub expires: Option<DateTime<Utc>>,
    /// Whether a session token was presented at all
    pub token_presented: bool,
}

impl AuthContext {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    fn unauthenticated(token_presented: bool) -> Self {
        Self {
            user: None,
            session_id: None,
            expires: None,
            token_presented,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session_cookie(parts) else {
            return Ok(Self::unauthenticated(false));
        };

        // Validation failures and store errors both collapse to
        // unauthenticated; the distinction never reaches the caller.
        match state.store.validate_session(&token, None).await {
            Ok(Some(summary)) => Ok(Self {
                user: Some(summary.user),
                session_id: Some(summary.session_id),
                expires: Some(summary.expires),
                token_presented: true,
            }),
            Ok(None) => Ok(Self::unauthenticated(true)),
            Err(e) => {
                tracing::warn!(error = %e, "Session validation failed in extractor");
                Ok(Self::unauthenticated(true))
            }
        }
    }
}

/// Pull the session token out of the Cookie header.
fn session_cookie(parts: &Parts) -> Option<String> {
    let cookies = parts.headers.get(header::COOKIE)?.to_str().ok()?;

    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

/// Client IP address.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // X-Forwarded-For first (for proxied requests), first hop wins
        if let Some(xff) = parts.headers.get("X-Forwarded-For") {
            if let Ok(xff_str) = xff.to_str() {
                if let Some(ip) = xff_str.split(',').next() {
                    let ip = ip.trim();
                    if !ip.is_empty() {
                        return Ok(ClientIp(Some(ip.to_string())));
                    }
                }
            }
        }

        if let Some(real_ip) = parts.headers.get("X-Real-IP") {
            if let Ok(ip) = real_ip.to_str() {
                return Ok(ClientIp(Some(ip.to_string())));
            }
        }

        Ok(ClientIp(None))
    }
}
