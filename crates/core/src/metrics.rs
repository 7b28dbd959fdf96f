use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Process-wide counters feeding `GET /metrics`. Updated via atomics;
/// derived aggregates (min/max/avg) are computed from the same atomics
/// rather than a separate locked struct, since each is independently
/// monotone.
pub struct MetricsRegistry {
    enabled: bool,
    started_at: Instant,
    total_requests: AtomicU64,
    total_successes: AtomicU64,
    total_failures: AtomicU64,
    total_retries: AtomicU64,
    response_ms_sum: AtomicU64,
    response_ms_min: AtomicU64,
    response_ms_max: AtomicU64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub total_retries: u64,
    pub success_rate: f64,
    pub requests_per_second: f64,
    pub response_ms_min: u64,
    pub response_ms_max: u64,
    pub response_ms_avg: f64,
}

impl MetricsRegistry {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            started_at: Instant::now(),
            total_requests: AtomicU64::new(0),
            total_successes: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            total_retries: AtomicU64::new(0),
            response_ms_sum: AtomicU64::new(0),
            response_ms_min: AtomicU64::new(u64::MAX),
            response_ms_max: AtomicU64::new(0),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(&self, success: bool, retries: u32, elapsed: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.total_successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.total_retries.fetch_add(retries as u64, Ordering::Relaxed);

        let ms = elapsed.as_millis() as u64;
        self.response_ms_sum.fetch_add(ms, Ordering::Relaxed);
        self.response_ms_min.fetch_min(ms, Ordering::Relaxed);
        self.response_ms_max.fetch_max(ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let successes = self.total_successes.load(Ordering::Relaxed);
        let failures = self.total_failures.load(Ordering::Relaxed);
        let retries = self.total_retries.load(Ordering::Relaxed);
        let sum = self.response_ms_sum.load(Ordering::Relaxed);
        let min = self.response_ms_min.load(Ordering::Relaxed);
        let max = self.response_ms_max.load(Ordering::Relaxed);

        let elapsed_secs = self.started_at.elapsed().as_secs_f64().max(1e-9);

        MetricsSnapshot {
            total_requests: total,
            total_successes: successes,
            total_failures: failures,
            total_retries: retries,
            success_rate: if total == 0 { 0.0 } else { successes as f64 / total as f64 },
            requests_per_second: total as f64 / elapsed_secs,
            response_ms_min: if total == 0 { 0 } else { min },
            response_ms_max: max,
            response_ms_avg: if total == 0 { 0.0 } else { sum as f64 / total as f64 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_with_no_requests_is_zeroed() {
        let m = MetricsRegistry::new(true);
        let snap = m.snapshot();
        assert_eq!(snap.total_requests, 0);
        assert_eq!(snap.success_rate, 0.0);
        assert_eq!(snap.response_ms_min, 0);
    }

    #[test]
    fn records_success_and_failure_counts() {
        let m = MetricsRegistry::new(true);
        m.record(true, 0, Duration::from_millis(10));
        m.record(false, 2, Duration::from_millis(20));
        let snap = m.snapshot();
        assert_eq!(snap.total_requests, 2);
        assert_eq!(snap.total_successes, 1);
        assert_eq!(snap.total_failures, 1);
        assert_eq!(snap.total_retries, 2);
        assert_eq!(snap.response_ms_min, 10);
        assert_eq!(snap.response_ms_max, 20);
    }
}
