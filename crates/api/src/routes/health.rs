//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::{health, metrics};

use crate::response::HealthResponse;
use crate::state::AppState;

/// GET /health - Full health check.
///
/// Probes the store on every call so the report reflects current
/// connectivity, not the last background check.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    match session_store::check_connection(&state.store).await {
        Ok(()) => health().store.set_healthy(),
        Err(e) => health().store.set_unhealthy(e.to_string()),
    }

    let report = health().report();

    Json(HealthResponse {
        status: format!("{:?}", report.status).to_lowercase(),
        store_connected: health().store.is_healthy(),
        auth_upstream_connected: health().auth_upstream.is_healthy(),
        active_sessions: metrics().active_sessions.get(),
    })
}

/// GET /health/ready - Readiness probe (can accept traffic).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
