//! Admission control: a global semaphore plus optional per-host semaphores.
//! Acquisition is global-then-host; release is automatic via RAII guards so
//! every acquire is paired with exactly one release on every exit path,
//! including cancellation and panics.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};

pub struct AdmissionController {
    global: Arc<Semaphore>,
    per_host_limits: HashMap<String, usize>,
    per_host: RwLock<HashMap<String, Arc<Semaphore>>>,
}

/// Holds both permits for the lifetime of one fetch. Dropping it releases
/// the per-host permit first, then the global one.
pub struct AdmissionGuard {
    _host: Option<OwnedSemaphorePermit>,
    _global: OwnedSemaphorePermit,
}

impl AdmissionController {
    pub fn new(max_concurrent: usize, per_host_limits: HashMap<String, usize>) -> Self {
        Self {
            global: Arc::new(Semaphore::new(max_concurrent.max(1))),
            per_host_limits,
            per_host: RwLock::new(HashMap::new()),
        }
    }

    /// Acquires a global permit, then (if the host is configured) a
    /// per-host permit. Blocks until both are available; callers needing
    /// cancellation should race this future against their cancellation
    /// token.
    pub async fn acquire(&self, host: &str) -> AdmissionGuard {
        let global = self
            .global
            .clone()
            .acquire_owned()
            .await
            .expect("global semaphore never closes");

        let host_permit = match self.per_host_limits.get(host) {
            Some(&limit) => {
                let sem = self.host_semaphore(host, limit).await;
                Some(sem.acquire_owned().await.expect("host semaphore never closes"))
            }
            None => None,
        };

        AdmissionGuard {
            _host: host_permit,
            _global: global,
        }
    }

    async fn host_semaphore(&self, host: &str, limit: usize) -> Arc<Semaphore> {
        if let Some(sem) = self.per_host.read().await.get(host) {
            return sem.clone();
        }
        let mut map = self.per_host.write().await;
        map.entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(limit)))
            .clone()
    }

    pub fn global_available(&self) -> usize {
        self.global.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn max_concurrent_one_serializes_fetches() {
        let ctrl = AdmissionController::new(1, HashMap::new());
        let first = ctrl.acquire("a").await;
        assert_eq!(ctrl.global_available(), 0);

        let ctrl_ref = &ctrl;
        let second = tokio::time::timeout(Duration::from_millis(20), ctrl_ref.acquire("b")).await;
        assert!(second.is_err(), "second acquire should block while first holds the only permit");

        drop(first);
        let second = ctrl.acquire("b").await;
        assert_eq!(ctrl.global_available(), 0);
        drop(second);
        assert_eq!(ctrl.global_available(), 1);
    }

    #[tokio::test]
    async fn per_host_limit_bounds_same_host_only() {
        let mut limits = HashMap::new();
        limits.insert("h".to_string(), 1);
        let ctrl = AdmissionController::new(10, limits);

        let guard_h = ctrl.acquire("h").await;
        let other_host = tokio::time::timeout(Duration::from_millis(20), ctrl.acquire("other")).await;
        assert!(other_host.is_ok(), "unrelated host must not be blocked by h's limit");

        let same_host = tokio::time::timeout(Duration::from_millis(20), ctrl.acquire("h")).await;
        assert!(same_host.is_err());

        drop(guard_h);
    }

    #[tokio::test]
    async fn dropping_guard_releases_both_permits() {
        let mut limits = HashMap::new();
        limits.insert("h".to_string(), 1);
        let ctrl = AdmissionController::new(1, limits);

        {
            let _guard = ctrl.acquire("h").await;
            assert_eq!(ctrl.global_available(), 0);
        }
        assert_eq!(ctrl.global_available(), 1);
    }
}
