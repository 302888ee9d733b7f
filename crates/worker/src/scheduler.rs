//! Worker scheduler for background tasks.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

use session_store::SessionStore;

use crate::cleanup::CleanupWorker;

/// Worker scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Cleanup sweep interval
    pub cleanup_interval: Duration,
    /// Metrics flush interval
    pub metrics_flush_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(3600), // 1 hour
            metrics_flush_interval: Duration::from_secs(60), // 1 minute
        }
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    store: Arc<SessionStore>,
}

impl WorkerScheduler {
    pub fn new(config: WorkerConfig, store: Arc<SessionStore>) -> Self {
        Self { config, store }
    }

    /// Starts all background workers.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        // Cleanup worker
        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_cleanup_worker().await;
        }));

        // Metrics flush worker
        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_metrics_flush().await;
        }));

        info!("Background workers started");
        handles
    }

    async fn run_cleanup_worker(&self) {
        let worker = CleanupWorker::new(self.store.clone());
        let mut ticker = interval(self.config.cleanup_interval);

        loop {
            ticker.tick().await;

            if let Err(e) = worker.run().await {
                error!("Cleanup worker error: {}", e);
            }
        }
    }

    async fn run_metrics_flush(&self) {
        use telemetry::metrics;

        let mut ticker = interval(self.config.metrics_flush_interval);

        loop {
            ticker.tick().await;

            let snapshot = metrics().snapshot();
            info!(
                sessions_created = snapshot.sessions_created,
                sessions_validated = snapshot.sessions_validated,
                validation_failures = snapshot.validation_failures,
                sessions_revoked = snapshot.sessions_revoked,
                active_sessions = snapshot.active_sessions,
                validate_latency_mean_ms = snapshot.validate_latency_mean_ms,
                upstream_latency_mean_ms = snapshot.upstream_latency_mean_ms,
                "Metrics snapshot"
            );
        }
    }
}
