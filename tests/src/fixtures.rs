//! Test fixtures for session bridge tests.

use axum_test::TestServer;
use bridge_core::hash_token;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

/// Access token used by most tests.
pub fn test_access_token() -> String {
    "access-token-1".to_string()
}

/// Digest the bridge expects for [`test_access_token`].
pub fn test_token_hash() -> String {
    hash_token(&test_access_token())
}

/// Decoded claims for a user, expiring `hours` from now.
pub fn decoded_payload(user_id: i64, roles: &[&str], hours: i64) -> Value {
    json!({
        "user_id": user_id,
        "exp": (Utc::now() + Duration::hours(hours)).timestamp(),
        "roles": roles,
        "profile": {
            "username": format!("user{}", user_id),
            "first_name": "Naledi",
            "last_name": "Seretse",
            "email": format!("user{}@example.com", user_id),
        }
    })
}

/// Request body for POST /auth/create-session.
pub fn create_session_body(payload: Value) -> Value {
    json!({
        "decodedPayload": payload,
        "accessToken": test_access_token(),
        "refreshToken": "refresh-token-1",
        "clientInfo": {
            "ipAddress": "203.0.113.9",
            "userAgent": "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Mobile",
        }
    })
}

/// Mint a session through the API and return the response body.
pub async fn create_session(server: &TestServer, user_id: i64, roles: &[&str]) -> Value {
    let response = server
        .post("/auth/create-session")
        .json(&create_session_body(decoded_payload(user_id, roles, 8)))
        .await;

    response.assert_status_ok();
    response.json()
}
