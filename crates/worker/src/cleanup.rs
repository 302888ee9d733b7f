//! Expired-session cleanup worker.
//!
//! One sweep per tick: close dangling audit rows, deactivate expired
//! sessions, purge inactive rows past the retention window. Audit rows
//! are never purged.

use session_store::{CleanupOutcome, SessionStore};
use std::sync::Arc;
use telemetry::metrics;
use tracing::{debug, info};

/// Worker that sweeps dead sessions out of the store.
pub struct CleanupWorker {
    store: Arc<SessionStore>,
}

impl CleanupWorker {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Run one cleanup sweep.
    pub async fn run(&self) -> Result<CleanupOutcome, bridge_core::Error> {
        let outcome = self.store.cleanup_expired_sessions().await?;

        metrics().cleanup_runs.inc();
        metrics().sessions_purged.inc_by(outcome.sessions_purged);
        metrics().analytics_closed.inc_by(outcome.analytics_closed);

        if outcome == CleanupOutcome::default() {
            debug!("Cleanup sweep found nothing to do");
        } else {
            info!(
                deactivated = outcome.sessions_deactivated,
                analytics_closed = outcome.analytics_closed,
                purged = outcome.sessions_purged,
                "Cleanup sweep complete"
            );
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::{ClientInfo, DecodedTokenPayload, Profile};
    use chrono::{Duration, Utc};
    use session_store::{init_schema, StoreConfig};

    async fn test_store() -> Arc<SessionStore> {
        let store = SessionStore::connect(StoreConfig::in_memory())
            .await
            .expect("connect in-memory store");
        init_schema(&store).await.expect("init schema");
        Arc::new(store)
    }

    fn payload(exp: i64) -> DecodedTokenPayload {
        DecodedTokenPayload {
            user_id: 11,
            exp,
            roles: vec![],
            profile: Profile {
                username: "worker-test".into(),
                first_name: String::new(),
                last_name: String::new(),
                email: "w@example.com".into(),
            },
        }
    }

    #[tokio::test]
    async fn test_sweep_deactivates_expired_sessions() {
        let store = test_store().await;
        let expired_exp = (Utc::now() - Duration::minutes(10)).timestamp();
        store
            .create_session(&payload(expired_exp), "a", "r", &ClientInfo::default())
            .await
            .unwrap();

        let worker = CleanupWorker::new(Arc::clone(&store));
        let outcome = worker.run().await.unwrap();

        assert_eq!(outcome.sessions_deactivated, 1);
        assert_eq!(outcome.analytics_closed, 1);

        // Nothing left for a second sweep
        let second = worker.run().await.unwrap();
        assert_eq!(second, CleanupOutcome::default());
    }
}
