//! Internal metrics collection.
//!
//! Counters are collected in-memory and periodically logged by the worker
//! scheduler's flush tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement, saturating at zero. A decrement without a matching
    /// increment must not wrap the gauge to u64::MAX.
    pub fn dec(&self) {
        self.dec_by(1);
    }

    pub fn dec_by(&self, n: u64) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(n))
            });
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the session bridge.
#[derive(Debug, Default)]
pub struct Metrics {
    // Session lifecycle
    pub sessions_created: Counter,
    pub sessions_validated: Counter,
    pub validation_failures: Counter,
    pub sessions_revoked: Counter,
    pub bulk_revocations: Counter,

    // Cleanup sweep
    pub cleanup_runs: Counter,
    pub sessions_purged: Counter,
    pub analytics_closed: Counter,

    // External auth microservice
    pub upstream_auth_calls: Counter,
    pub upstream_auth_failures: Counter,

    // Request shaping
    pub rate_limited_requests: Counter,

    // Latency histograms
    pub validate_latency_ms: Histogram,
    pub upstream_latency_ms: Histogram,

    // Gauges
    pub active_sessions: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub sessions_created: u64,
    pub sessions_validated: u64,
    pub validation_failures: u64,
    pub sessions_revoked: u64,
    pub bulk_revocations: u64,
    pub cleanup_runs: u64,
    pub sessions_purged: u64,
    pub analytics_closed: u64,
    pub upstream_auth_calls: u64,
    pub upstream_auth_failures: u64,
    pub rate_limited_requests: u64,
    pub validate_latency_mean_ms: f64,
    pub upstream_latency_mean_ms: f64,
    pub active_sessions: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            sessions_created: self.sessions_created.get(),
            sessions_validated: self.sessions_validated.get(),
            validation_failures: self.validation_failures.get(),
            sessions_revoked: self.sessions_revoked.get(),
            bulk_revocations: self.bulk_revocations.get(),
            cleanup_runs: self.cleanup_runs.get(),
            sessions_purged: self.sessions_purged.get(),
            analytics_closed: self.analytics_closed.get(),
            upstream_auth_calls: self.upstream_auth_calls.get(),
            upstream_auth_failures: self.upstream_auth_failures.get(),
            rate_limited_requests: self.rate_limited_requests.get(),
            validate_latency_mean_ms: self.validate_latency_ms.mean(),
            upstream_latency_mean_ms: self.upstream_latency_ms.mean(),
            active_sessions: self.active_sessions.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
