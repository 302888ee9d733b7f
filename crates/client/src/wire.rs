//! Wire shapes exchanged with the auth microservice and the bridge.

use bridge_core::{AuthenticatedUser, ClientInfo, DecodedTokenPayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct LoginResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Serialize)]
pub(crate) struct DecodeRequest<'a> {
    pub token: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct DecodeResponse {
    pub payload: DecodedTokenPayload,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateSessionRequest<'a> {
    pub decoded_payload: &'a DecodedTokenPayload,
    pub access_token: &'a str,
    pub refresh_token: &'a str,
    pub client_info: ClientInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateSessionResponse {
    pub session_token: String,
    pub user: AuthenticatedUser,
    pub expires: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValidateSessionRequest<'a> {
    pub session_token: &'a str,
    pub token_hash: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct ValidateSessionResponse {
    pub session: ValidatedSession,
}

#[derive(Deserialize)]
pub(crate) struct ValidatedSession {
    pub user: AuthenticatedUser,
    pub expires: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct RefreshResponse {
    pub access: String,
    pub refresh: String,
    pub decoded: DecodedTokenPayload,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LogoutRequest<'a> {
    pub session_token: &'a str,
    pub reason: &'a str,
}

/// The snapshot persisted under the user_data storage key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredUser {
    pub user: AuthenticatedUser,
    pub expires: DateTime<Utc>,
}
