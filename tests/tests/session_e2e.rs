//! End-to-end tests for the session lifecycle.
//!
//! These tests drive the full flow over the real router:
//! create-session → validate-session / me → logout → 401.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use integration_tests::{fixtures, setup::TestContext};

#[tokio::test]
async fn test_create_session_returns_identity_snapshot() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let body = fixtures::create_session(&server, 7, &["agent", "admin"]).await;

    assert_eq!(body["success"], true);
    assert!(body["sessionToken"].as_str().unwrap().len() >= 32);
    assert_eq!(body["user"]["id"], "7");
    assert_eq!(body["user"]["name"], "Naledi Seretse");
    // Highest external role wins
    assert_eq!(body["user"]["role"], "ADMIN");
    // The token hash never leaves the store
    assert!(body.get("tokenHash").is_none());
}

#[tokio::test]
async fn test_validate_session_round_trip() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let created = fixtures::create_session(&server, 7, &["agent"]).await;
    let token = created["sessionToken"].as_str().unwrap();

    let response = server
        .post("/auth/validate-session")
        .json(&serde_json::json!({
            "sessionToken": token,
            "tokenHash": fixtures::test_token_hash(),
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["valid"], true);
    assert_eq!(body["session"]["user"]["email"], "user7@example.com");

    // Expiry carried through from the decoded claims
    let expires: DateTime<Utc> =
        serde_json::from_value(body["session"]["expires"].clone()).unwrap();
    assert!(expires > Utc::now());
}

#[tokio::test]
async fn test_validate_session_rejects_wrong_token_hash() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let created = fixtures::create_session(&server, 7, &["agent"]).await;
    let token = created["sessionToken"].as_str().unwrap();

    // A stale access token presented with a live session token
    let response = server
        .post("/auth/validate-session")
        .json(&serde_json::json!({
            "sessionToken": token,
            "tokenHash": bridge_core::hash_token("some-other-access-token"),
        }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "AUTH_002");
}

#[tokio::test]
async fn test_validate_unknown_token_is_generic_401() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server
        .post("/auth/validate-session")
        .json(&serde_json::json!({ "sessionToken": "no-such-session" }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    // Unknown and revoked sessions produce the same response
    assert_eq!(body["code"], "AUTH_002");
    assert_eq!(body["error"], "Invalid session");
}

#[tokio::test]
async fn test_me_with_header_and_cookie() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let created = fixtures::create_session(&server, 9, &["supervisor"]).await;
    let token = created["sessionToken"].as_str().unwrap();

    // Header path
    let response = server.get("/auth/me").add_header("X-Session-Token", token).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["isAuthenticated"], true);
    assert_eq!(body["user"]["role"], "SUPERVISOR");

    // Cookie path
    let response = server
        .get("/auth/me")
        .add_header("Cookie", format!("session-token={}", token))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["user"]["id"], "9");
}

#[tokio::test]
async fn test_me_without_token_is_401() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server.get("/auth/me").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "AUTH_001");
}

#[tokio::test]
async fn test_logout_then_me_is_401() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let created = fixtures::create_session(&server, 7, &["agent"]).await;
    let token = created["sessionToken"].as_str().unwrap();

    let response = server
        .post("/auth/logout")
        .json(&serde_json::json!({ "sessionToken": token }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);

    // Revocation is visible immediately
    let response = server.get("/auth/me").add_header("X-Session-Token", token).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "AUTH_002");
}

#[tokio::test]
async fn test_double_logout_keeps_active_count_sane() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let created = fixtures::create_session(&server, 7, &["agent"]).await;
    let token = created["sessionToken"].as_str().unwrap();

    // Logging out twice still reports success both times
    for _ in 0..2 {
        let response = server
            .post("/auth/logout")
            .json(&serde_json::json!({ "sessionToken": token }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], true);
    }

    // The second logout matched no live session, so the active-session
    // gauge must not have wrapped below zero
    let response = server.get("/health").await;
    let body: serde_json::Value = response.json();
    assert!(body["active_sessions"].as_u64().unwrap() < 1_000_000);
}

#[tokio::test]
async fn test_create_session_rate_limited() {
    let ctx = TestContext::with_tight_rate_limit(2).await;
    let server = ctx.server();

    for _ in 0..2 {
        fixtures::create_session(&server, 7, &["agent"]).await;
    }

    let response = server
        .post("/auth/create-session")
        .json(&fixtures::create_session_body(fixtures::decoded_payload(
            7,
            &["agent"],
            8,
        )))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get("Retry-After").is_some());
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "RATE_001");
}
