//! Session Bridge Service
//!
//! Bridges an external auth microservice into locally-managed sessions:
//! - Session minting from decoded token claims
//! - Validation, revocation, and bulk revocation
//! - Session audit trail and analytics listing
//! - Background cleanup of expired and aged-out sessions

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};

use api::{router, AppState};
use session_store::{init_schema, SessionStore, StoreConfig};
use telemetry::{health, init_tracing_from_env};
use worker::{WorkerConfig, WorkerScheduler};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// External auth microservice URL; empty or "mock" enables mock mode
    #[serde(default = "default_auth_url")]
    auth_url: String,

    #[serde(default)]
    store: StoreConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_auth_url() -> String {
    "http://auth-service:8000".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth_url: default_auth_url(),
            store: StoreConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing_from_env();

    info!("Starting Session Bridge v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config()?;

    info!(
        store_url = %config.store.url,
        auth_url = %config.auth_url,
        "Loaded configuration"
    );

    // Connect the session store and initialize the schema
    let store = Arc::new(
        SessionStore::connect(config.store.clone())
            .await
            .context("Failed to connect session store")?,
    );
    init_schema(&store)
        .await
        .context("Failed to initialize session store schema")?;

    // Create application state
    let state = AppState::new(store.clone(), &config.auth_url);

    // Check health and update status
    check_health(&state).await;

    // Start background workers
    let worker_scheduler = Arc::new(WorkerScheduler::new(WorkerConfig::default(), store.clone()));
    let _worker_handles = worker_scheduler.start();

    // Start rate limiter cleanup background task
    let _rate_limiter_cleanup = state.start_rate_limiter_cleanup();
    info!("Started rate limiter cleanup task (every 5 minutes)");

    // Create router
    let app = router(state);

    // Start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("BRIDGE")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Manual overrides for nested store config from environment
    // The config crate's nested parsing doesn't work reliably with underscored field names
    if let Ok(url) = std::env::var("BRIDGE_STORE_URL") {
        config.store.url = url;
    }
    if let Ok(days) = std::env::var("BRIDGE_STORE_RETENTION_DAYS") {
        if let Ok(days) = days.parse() {
            config.store.retention_days = days;
        }
    }

    // Auth URL override
    if let Ok(auth_url) = std::env::var("BRIDGE_AUTH_URL") {
        config.auth_url = auth_url;
    }

    Ok(config)
}

/// Check component health on startup.
async fn check_health(state: &AppState) {
    // Check the session store
    match session_store::check_connection(&state.store).await {
        Ok(()) => {
            health().store.set_healthy();
            info!("Session store connection: healthy");
        }
        Err(e) => {
            health().store.set_unhealthy(e.to_string());
            error!("Session store connection: unhealthy");
        }
    }

    // Check the external auth microservice
    if state.auth.ping().await {
        health().auth_upstream.set_healthy();
        info!("Auth upstream connection: healthy");
    } else {
        health().auth_upstream.set_unhealthy("Connection failed");
        error!("Auth upstream connection: unhealthy");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
