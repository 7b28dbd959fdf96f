//! Per-host three-state circuit breaker. Mirrors the in-memory per-domain
//! rate-limit state pattern: a lazily populated map guarded by a
//! `tokio::sync::RwLock`, with a per-host mutex for the mutable counters.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use scrape_core::ScrapeError;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
    pub halfopen_probe_count: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            halfopen_probe_count: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BreakerStats {
    pub state: BreakerState,
    pub failure_count: u32,
    pub success_count: u32,
    pub total_requests: u64,
    pub total_failures: u64,
    pub total_successes: u64,
}

struct HostEntry {
    state: BreakerState,
    failure_count: u32,
    success_count: u32,
    last_transition_at: Instant,
    total_requests: u64,
    total_failures: u64,
    total_successes: u64,
}

impl HostEntry {
    fn new() -> Self {
        Self {
            state: BreakerState::Closed,
            failure_count: 0,
            success_count: 0,
            last_transition_at: Instant::now(),
            total_requests: 0,
            total_failures: 0,
            total_successes: 0,
        }
    }

    fn transition(&mut self, state: BreakerState) {
        self.state = state;
        self.failure_count = 0;
        self.success_count = 0;
        self.last_transition_at = Instant::now();
    }
}

/// Guards strategy invocations per host. Entries are created lazily on
/// first use and never reclaimed for the life of the process.
pub struct BreakerRegistry {
    hosts: RwLock<HashMap<String, Arc<Mutex<HostEntry>>>>,
    config: BreakerConfig,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            hosts: RwLock::new(HashMap::new()),
            config,
        }
    }

    async fn entry_for(&self, host: &str) -> Arc<Mutex<HostEntry>> {
        if let Some(entry) = self.hosts.read().await.get(host) {
            return entry.clone();
        }
        let mut hosts = self.hosts.write().await;
        hosts
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(HostEntry::new())))
            .clone()
    }

    /// Admits a call for `host`, runs `f`, and records the outcome. Returns
    /// `ScrapeError::BreakerOpen` without invoking `f` when the breaker is
    /// open.
    pub async fn guard<F, Fut, T>(&self, host: &str, f: F) -> Result<T, ScrapeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ScrapeError>>,
    {
        self.admit(host).await?;
        match f().await {
            Ok(value) => {
                self.record_success(host).await;
                Ok(value)
            }
            Err(err) => {
                self.record_failure(host).await;
                Err(err)
            }
        }
    }

    async fn admit(&self, host: &str) -> Result<(), ScrapeError> {
        let entry = self.entry_for(host).await;
        let mut guard = entry.lock().await;

        if guard.state == BreakerState::Open
            && guard.last_transition_at.elapsed() >= self.config.reset_timeout
        {
            guard.transition(BreakerState::HalfOpen);
        }

        match guard.state {
            BreakerState::Closed => {
                guard.total_requests += 1;
                Ok(())
            }
            BreakerState::Open => Err(ScrapeError::BreakerOpen {
                host: host.to_string(),
            }),
            BreakerState::HalfOpen => {
                if guard.success_count < self.config.halfopen_probe_count {
                    guard.total_requests += 1;
                    Ok(())
                } else {
                    Err(ScrapeError::BreakerOpen {
                        host: host.to_string(),
                    })
                }
            }
        }
    }

    async fn record_success(&self, host: &str) {
        let entry = self.entry_for(host).await;
        let mut guard = entry.lock().await;
        guard.total_successes += 1;

        match guard.state {
            BreakerState::Closed => {
                guard.failure_count = 0;
            }
            BreakerState::HalfOpen => {
                guard.success_count += 1;
                if guard.success_count >= self.config.halfopen_probe_count {
                    guard.transition(BreakerState::Closed);
                }
            }
            BreakerState::Open => {}
        }
    }

    async fn record_failure(&self, host: &str) {
        let entry = self.entry_for(host).await;
        let mut guard = entry.lock().await;
        guard.total_failures += 1;

        match guard.state {
            BreakerState::Closed => {
                guard.failure_count += 1;
                if guard.failure_count >= self.config.failure_threshold {
                    tracing::warn!(host, "circuit breaker opening");
                    guard.transition(BreakerState::Open);
                }
            }
            BreakerState::HalfOpen => {
                tracing::warn!(host, "circuit breaker reopening after half-open failure");
                guard.transition(BreakerState::Open);
            }
            BreakerState::Open => {}
        }
    }

    pub async fn stats(&self, host: &str) -> Option<BreakerStats> {
        let hosts = self.hosts.read().await;
        let entry = hosts.get(host)?.clone();
        drop(hosts);
        let guard = entry.lock().await;
        Some(BreakerStats {
            state: guard.state,
            failure_count: guard.failure_count,
            success_count: guard.success_count,
            total_requests: guard.total_requests,
            total_failures: guard.total_failures,
            total_successes: guard.total_successes,
        })
    }

    pub async fn all_stats(&self) -> HashMap<String, BreakerStats> {
        let hosts: Vec<String> = self.hosts.read().await.keys().cloned().collect();
        let mut out = HashMap::with_capacity(hosts.len());
        for host in hosts {
            if let Some(stats) = self.stats(&host).await {
                out.insert(host, stats);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ok() -> Result<(), ScrapeError> {
        Ok(())
    }

    fn fail() -> Result<(), ScrapeError> {
        Err(ScrapeError::Transport {
            url: "http://x".into(),
            message: "boom".into(),
        })
    }

    #[tokio::test]
    async fn opens_after_threshold_failures() {
        let reg = BreakerRegistry::new(BreakerConfig {
            failure_threshold: 2,
            ..Default::default()
        });

        let _ = reg.guard("h", || async { fail() }).await;
        let _ = reg.guard("h", || async { fail() }).await;

        let result = reg.guard("h", ok).await;
        assert!(matches!(result, Err(ScrapeError::BreakerOpen { .. })));
        let stats = reg.stats("h").await.unwrap();
        assert_eq!(stats.state, BreakerState::Open);
    }

    #[tokio::test]
    async fn halfopen_probe_closes_on_success_and_reopens_on_failure() {
        let reg = BreakerRegistry::new(BreakerConfig {
            failure_threshold: 1,
            reset_timeout: Duration::from_millis(10),
            halfopen_probe_count: 1,
        });

        let _ = reg.guard("h", || async { fail() }).await;
        assert_eq!(reg.stats("h").await.unwrap().state, BreakerState::Open);

        tokio::time::sleep(Duration::from_millis(20)).await;

        reg.guard("h", ok).await.unwrap();
        assert_eq!(reg.stats("h").await.unwrap().state, BreakerState::Closed);

        let _ = reg.guard("h", || async { fail() }).await;
        let stats = reg.stats("h").await.unwrap();
        assert_eq!(stats.state, BreakerState::Open);
        assert_eq!(stats.failure_count, 1);
    }

    #[tokio::test]
    async fn breaker_open_never_invokes_the_guarded_call() {
        let reg = BreakerRegistry::new(BreakerConfig {
            failure_threshold: 1,
            ..Default::default()
        });
        let _ = reg.guard("h", || async { fail() }).await;

        let invoked = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let invoked_clone = invoked.clone();
        let _ = reg
            .guard("h", || async move {
                invoked_clone.store(true, std::sync::atomic::Ordering::SeqCst);
                ok().await
            })
            .await;

        assert!(!invoked.load(std::sync::atomic::Ordering::SeqCst));
    }
}
