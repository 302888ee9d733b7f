//! Common test setup functions.

use api::middleware::rate_limit::RateLimitConfig;
use api::{router, AppState};
use axum::Router;
use axum_test::TestServer;
use session_store::{init_schema, SessionStore, StoreConfig};
use std::sync::Arc;

/// Test context with an in-memory store and mock external auth.
///
/// This provides the same production code paths by:
/// - Using the real Axum router with all middleware
/// - Using the auth client's mock mode instead of a live microservice
/// - Using an in-memory SQLite store for state verification
pub struct TestContext {
    pub store: Arc<SessionStore>,
    pub router: Router,
}

impl TestContext {
    /// Create a new test context with all components initialized.
    pub async fn new() -> Self {
        let store = Arc::new(
            SessionStore::connect(StoreConfig::in_memory())
                .await
                .expect("Failed to connect in-memory store"),
        );
        init_schema(&store)
            .await
            .expect("Failed to initialize schema");

        // Generous limits so ordinary tests never trip the rate limiter;
        // the rate limit test builds its own state.
        let state = AppState::with_rate_limit(
            store.clone(),
            "mock",
            RateLimitConfig {
                rate: 1_000,
                burst: 1_000,
            },
        );
        let router = router(state);

        Self { store, router }
    }

    /// Create a context whose rate limiter rejects quickly.
    pub async fn with_tight_rate_limit(burst: u32) -> Self {
        let store = Arc::new(
            SessionStore::connect(StoreConfig::in_memory())
                .await
                .expect("Failed to connect in-memory store"),
        );
        init_schema(&store)
            .await
            .expect("Failed to initialize schema");

        let state =
            AppState::with_rate_limit(store.clone(), "mock", RateLimitConfig { rate: 1, burst });
        let router = router(state);

        Self { store, router }
    }

    /// Test server over the full router.
    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("Failed to create test server")
    }
}
