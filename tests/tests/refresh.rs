//! Tests for the refresh proxy.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use integration_tests::{fixtures, setup::TestContext};

#[tokio::test]
async fn test_refresh_returns_new_pair_and_claims() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server
        .post("/auth/refresh")
        .json(&serde_json::json!({ "refreshToken": "refresh-token-1" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["access"].as_str().unwrap().starts_with("mock-access-"));
    assert!(body["refresh"].as_str().unwrap().starts_with("mock-refresh-"));
    assert!(body["decoded"]["exp"].as_i64().unwrap() > Utc::now().timestamp());
    assert!(body["decoded"]["profile"]["email"].is_string());
}

#[tokio::test]
async fn test_refresh_does_not_extend_stored_session() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let created = fixtures::create_session(&server, 7, &["agent"]).await;
    let token = created["sessionToken"].as_str().unwrap();
    let original_expires: DateTime<Utc> =
        serde_json::from_value(created["expires"].clone()).unwrap();

    server
        .post("/auth/refresh")
        .json(&serde_json::json!({ "refreshToken": "refresh-token-1" }))
        .await
        .assert_status_ok();

    // The stored session keeps its original expiry; only the client-held
    // tokens move.
    let sessions = ctx.store.get_user_active_sessions("7").await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].expires, original_expires);

    let response = server
        .post("/auth/validate-session")
        .json(&serde_json::json!({ "sessionToken": token }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let validated: DateTime<Utc> =
        serde_json::from_value(body["session"]["expires"].clone()).unwrap();
    assert_eq!(validated, original_expires);
}

#[tokio::test]
async fn test_refresh_requires_body() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server
        .post("/auth/refresh")
        .json(&serde_json::json!({}))
        .await;
    // Missing refreshToken fails body extraction
    assert_ne!(response.status_code(), StatusCode::OK);
}
