//! Session lifecycle endpoints.
//!
//! The login handshake itself happens client-side against the external
//! auth microservice; these routes mint, validate, list and revoke the
//! bridged sessions, and proxy the refresh call.

use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, info, warn};
use validator::Validate;

use bridge_core::{
    AuthenticatedUser, ClientInfo, CreatedSession, DecodedTokenPayload, SessionAnalytics,
    SessionSummary, TokenPair, ValidationErrorCode,
};

use crate::extractors::{AuthContext, ClientIp};
use crate::middleware::auth::ensure_account_exists;
use crate::response::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub decoded_payload: DecodedTokenPayload,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub success: bool,
    #[serde(flatten)]
    pub session: CreatedSession,
}

/// POST /auth/create-session - Mint a bridged session from decoded claims.
///
/// The proxy-reported client IP overrides whatever the caller put in
/// clientInfo. Rate limited per client IP.
pub async fn create_session_handler(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    check_rate_limit(&state, client_ip.as_deref())?;

    request.decoded_payload.validate().map_err(|e| {
        ApiError::validation(
            ValidationErrorCode::InvalidPayload.code(),
            vec![e.to_string()],
        )
    })?;

    let mut client_info = request.client_info.unwrap_or_default();
    if client_ip.is_some() {
        client_info.ip_address = client_ip;
    }

    let created = state
        .store
        .create_session(
            &request.decoded_payload,
            &request.access_token,
            &request.refresh_token,
            &client_info,
        )
        .await?;

    metrics().sessions_created.inc();
    metrics().active_sessions.inc();

    ensure_account_exists(&state.store, &created.user).await?;

    info!(
        session_id = %created.session_id,
        user_id = %created.user.id,
        role = %created.user.role,
        "Session created"
    );

    Ok(Json(CreateSessionResponse {
        success: true,
        session: created,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateSessionRequest {
    pub session_token: String,
    #[serde(default)]
    pub token_hash: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateSessionResponse {
    pub valid: bool,
    pub session: SessionSummary,
}

/// POST /auth/validate-session - Resolve a session token.
///
/// Every invalid outcome is the same generic 401; unknown, expired,
/// revoked and hash-mismatched tokens are indistinguishable.
pub async fn validate_session_handler(
    State(state): State<AppState>,
    Json(request): Json<ValidateSessionRequest>,
) -> Result<Json<ValidateSessionResponse>, ApiError> {
    let start = Instant::now();

    let result = state
        .store
        .validate_session(&request.session_token, request.token_hash.as_deref())
        .await?;

    metrics()
        .validate_latency_ms
        .observe(start.elapsed().as_millis() as u64);

    match result {
        Some(summary) => {
            metrics().sessions_validated.inc();
            Ok(Json(ValidateSessionResponse {
                valid: true,
                session: summary,
            }))
        }
        None => {
            metrics().validation_failures.inc();
            Err(ApiError::unauthorized("AUTH_002", "Invalid session"))
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub is_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<AuthenticatedUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

/// GET /auth/me - Identity behind the presented session token.
///
/// Browser callers carry the session cookie; non-browser callers can use
/// the X-Session-Token header instead.
pub async fn me_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    headers: axum::http::HeaderMap,
) -> Result<Json<MeResponse>, ApiError> {
    if ctx.is_authenticated() {
        return Ok(Json(MeResponse {
            is_authenticated: true,
            user: ctx.user,
            expires: ctx.expires,
        }));
    }

    let header_token = headers
        .get("X-Session-Token")
        .and_then(|h| h.to_str().ok())
        .filter(|t| !t.is_empty());

    let Some(token) = header_token else {
        if ctx.token_presented {
            return Err(ApiError::unauthorized("AUTH_002", "Invalid session"));
        }
        return Err(ApiError::unauthorized("AUTH_001", "Authentication required"));
    };

    let summary = state
        .store
        .validate_session(token, None)
        .await?
        .ok_or_else(|| ApiError::unauthorized("AUTH_002", "Invalid session"))?;

    Ok(Json(MeResponse {
        is_authenticated: true,
        user: Some(summary.user),
        expires: Some(summary.expires),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub session_token: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// POST /auth/logout - Revoke the caller's own session.
/// Revoking an already-dead session still reports success.
pub async fn logout_handler(
    State(state): State<AppState>,
    Json(request): Json<LogoutRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let reason = request.reason.as_deref().unwrap_or("logout");

    let revoked = state
        .store
        .revoke_session(&request.session_token, None, Some(reason))
        .await?;

    // Unknown or already-dead tokens still report success but must not
    // move the counters
    if revoked {
        metrics().sessions_revoked.inc();
        metrics().active_sessions.dec();
    }
    debug!("Session logged out");

    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevokeRequest {
    session_token: Option<String>,
    user_id: Option<String>,
    #[serde(default)]
    revoke_all: bool,
    revoked_by: Option<String>,
    reason: Option<String>,
}

/// POST /auth/revoke - Administrative revocation.
///
/// Accepts either `{sessionToken}` for one session or
/// `{userId, revokeAll: true}` for every active session of a user.
/// Anything else is a 400.
pub async fn revoke_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    let request: RevokeRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Malformed revoke payload");
        ApiError::bad_request("Malformed request body")
    })?;

    match (&request.session_token, &request.user_id) {
        (Some(token), _) => {
            let revoked = state
                .store
                .revoke_session(
                    token,
                    request.revoked_by.as_deref(),
                    request.reason.as_deref(),
                )
                .await?;
            if revoked {
                metrics().sessions_revoked.inc();
                metrics().active_sessions.dec();
            }
        }
        (None, Some(user_id)) if request.revoke_all => {
            let revoked = state
                .store
                .revoke_all_user_sessions(
                    user_id,
                    request.revoked_by.as_deref(),
                    request.reason.as_deref(),
                )
                .await?;
            metrics().bulk_revocations.inc();
            metrics().sessions_revoked.inc_by(revoked);
            metrics().active_sessions.dec_by(revoked);
            info!(user_id = %user_id, revoked, "All user sessions revoked");
        }
        _ => {
            return Err(ApiError::validation(
                ValidationErrorCode::InvalidPayload.code(),
                vec!["sessionToken or userId with revokeAll required".into()],
            ));
        }
    }

    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsQuery {
    pub user_id: Option<String>,
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionAnalytics>,
    pub count: usize,
}

/// GET /auth/sessions?userId=&days= - Session audit listing.
/// Authorization is left to the deployment in front of this route.
pub async fn sessions_handler(
    State(state): State<AppState>,
    Query(query): Query<SessionsQuery>,
) -> Result<Json<SessionsResponse>, ApiError> {
    let sessions = state
        .store
        .get_session_analytics(query.user_id.as_deref(), query.days.unwrap_or(30))
        .await?;

    Ok(Json(SessionsResponse {
        count: sessions.len(),
        sessions,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshTokenResponse {
    pub access: String,
    pub refresh: String,
    pub decoded: DecodedTokenPayload,
}

/// POST /auth/refresh - Proxy the external refresh flow.
///
/// Returns the new token pair and its decoded claims. The stored
/// session's expiry is deliberately left untouched; only the client-held
/// expiry moves.
pub async fn refresh_handler(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<RefreshTokenResponse>, ApiError> {
    check_rate_limit(&state, client_ip.as_deref())?;

    let TokenPair { access, refresh } = state.auth.refresh(&request.refresh_token).await?;
    let decoded = state.auth.decode(&access).await?;

    debug!(user_id = decoded.user_id, "Token pair refreshed");

    Ok(Json(RefreshTokenResponse {
        access,
        refresh,
        decoded,
    }))
}

/// Apply the per-IP token bucket. Clients without a resolvable IP share
/// one bucket.
fn check_rate_limit(state: &AppState, client_ip: Option<&str>) -> Result<(), ApiError> {
    let key = client_ip.unwrap_or("unknown");

    if !state.rate_limiter.check(key) {
        metrics().rate_limited_requests.inc();
        warn!(client_ip = %key, "Rate limit exceeded");
        return Err(ApiError::rate_limited("Too many requests", Some(1)));
    }

    Ok(())
}
