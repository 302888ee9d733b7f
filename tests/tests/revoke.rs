//! Tests for administrative revocation and the analytics listing.

use axum::http::StatusCode;
use integration_tests::{fixtures, setup::TestContext};

#[tokio::test]
async fn test_revoke_single_session() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let created = fixtures::create_session(&server, 7, &["agent"]).await;
    let token = created["sessionToken"].as_str().unwrap();

    let response = server
        .post("/auth/revoke")
        .json(&serde_json::json!({
            "sessionToken": token,
            "revokedBy": "admin-1",
            "reason": "policy",
        }))
        .await;
    response.assert_status_ok();

    let response = server.get("/auth/me").add_header("X-Session-Token", token).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_revoke_all_user_sessions() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    for _ in 0..3 {
        fixtures::create_session(&server, 9, &["agent"]).await;
    }
    let other = fixtures::create_session(&server, 10, &["agent"]).await;

    let response = server
        .post("/auth/revoke")
        .json(&serde_json::json!({
            "userId": "9",
            "revokeAll": true,
            "reason": "offboarded",
        }))
        .await;
    response.assert_status_ok();

    assert!(ctx.store.get_user_active_sessions("9").await.unwrap().is_empty());

    // Unrelated user is untouched
    let other_token = other["sessionToken"].as_str().unwrap();
    let response = server
        .get("/auth/me")
        .add_header("X-Session-Token", other_token)
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_revoke_rejects_malformed_body() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server
        .post("/auth/revoke")
        .content_type("application/json")
        .bytes("not json at all".into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

#[tokio::test]
async fn test_revoke_rejects_incomplete_body() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    // userId without revokeAll is not a valid request shape
    let response = server
        .post("/auth/revoke")
        .json(&serde_json::json!({ "userId": "9" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

#[tokio::test]
async fn test_sessions_listing_scoped_by_user() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    fixtures::create_session(&server, 7, &["agent"]).await;
    fixtures::create_session(&server, 8, &["supervisor"]).await;

    let response = server.get("/auth/sessions").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["count"], 2);

    let response = server.get("/auth/sessions").add_query_param("userId", "8").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["count"], 1);
    assert_eq!(body["sessions"][0]["userRole"], "SUPERVISOR");
    // Audit rows stay open until the session ends
    assert!(body["sessions"][0]["logoutTime"].is_null());
}

#[tokio::test]
async fn test_sessions_listing_rejects_oversized_window() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    // A days value beyond what the window arithmetic can represent is a
    // 400, not a dropped connection
    let response = server
        .get("/auth/sessions")
        .add_query_param("days", "999999999999999999")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

#[tokio::test]
async fn test_logout_closes_audit_row() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let created = fixtures::create_session(&server, 7, &["agent"]).await;
    let token = created["sessionToken"].as_str().unwrap();

    server
        .post("/auth/logout")
        .json(&serde_json::json!({ "sessionToken": token }))
        .await
        .assert_status_ok();

    let response = server.get("/auth/sessions").add_query_param("userId", "7").await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["count"], 1);
    assert!(!body["sessions"][0]["logoutTime"].is_null());
    assert!(body["sessions"][0]["duration"].as_i64().unwrap() >= 0);
}
