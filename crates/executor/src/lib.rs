//! Job executor: drives batch fan-out and single-seed pagination through
//! Admission -> Breaker -> Retry -> Strategy, and persists job state.

use std::collections::HashSet;
use std::sync::Arc;

use scrape_admission::AdmissionController;
use scrape_breaker::{BreakerConfig, BreakerRegistry, BreakerStats};
use scrape_core::{Config, Job, JobRequest, MetricsRegistry, ScrapeResult};
use scrape_fetch::FetchStrategy;
use scrape_retry::{RetryConfig, RetryController};
use scrape_store::JobStore;
use std::collections::HashMap;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct Inner {
    config: Config,
    admission: AdmissionController,
    breaker: BreakerRegistry,
    strategy: Arc<dyn FetchStrategy>,
    store: Arc<dyn JobStore>,
    metrics: Arc<MetricsRegistry>,
}

/// Cheaply cloneable handle; every clone shares the same admission
/// controller, breaker registry, and store.
#[derive(Clone)]
pub struct Executor(Arc<Inner>);

impl Executor {
    pub fn new(
        config: Config,
        strategy: Arc<dyn FetchStrategy>,
        store: Arc<dyn JobStore>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let admission = AdmissionController::new(config.max_concurrent, config.per_host_limits.clone());
        let breaker = BreakerRegistry::new(BreakerConfig {
            failure_threshold: config.breaker_failure_threshold,
            reset_timeout: config.breaker_reset_timeout,
            halfopen_probe_count: config.breaker_halfopen_probe_count,
        });
        Self(Arc::new(Inner {
            config,
            admission,
            breaker,
            strategy,
            store,
            metrics,
        }))
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.0.store
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.0.metrics
    }

    pub async fn host_stats(&self) -> HashMap<String, BreakerStats> {
        self.0.breaker.all_stats().await
    }

    /// Submits a new job: persists it `pending` and spawns background
    /// execution without awaiting it. Returns the assigned job id.
    pub async fn submit(&self, request: JobRequest) -> Result<Uuid, scrape_store::StoreError> {
        let job = Job::new(request);
        let id = job.id;
        self.0.store.save_job(&job).await?;

        let exec = self.clone();
        tokio::spawn(async move { exec.run_job(id).await });

        Ok(id)
    }

    async fn run_job(&self, job_id: Uuid) {
        let Ok(Some(mut job)) = self.0.store.get_job(job_id).await else {
            tracing::error!(%job_id, "job vanished before execution started");
            return;
        };

        job.mark_running();
        if let Err(e) = self.0.store.update_job(&job).await {
            tracing::error!(%job_id, error = %e, "failed to persist running state");
        }

        let cancel = CancellationToken::new();
        let request = job.request.clone();
        let exec = self.clone();
        let cancel_for_task = cancel.clone();

        let mut handle = tokio::spawn(async move {
            match request {
                JobRequest::Batch { urls } => exec.run_batch(urls, cancel_for_task).await,
                JobRequest::Pagination { seed_url, max_pages } => {
                    exec.run_pagination(seed_url, max_pages, cancel_for_task).await
                }
            }
        });

        let results = match tokio::time::timeout(self.0.config.total_timeout, &mut handle).await {
            Ok(joined) => joined.unwrap_or_default(),
            Err(_) => {
                tracing::warn!(%job_id, "job exceeded total timeout, cancelling outstanding fetches");
                cancel.cancel();
                // Every suspension point in the spawned task honors
                // `cancel`, so it still finishes promptly and its
                // (possibly partial) results are not lost.
                handle.await.unwrap_or_default()
            }
        };

        for result in results {
            job.push_result(result);
        }
        job.mark_completed();

        if let Err(e) = self.0.store.update_job(&job).await {
            tracing::error!(%job_id, error = %e, "store failed on terminal transition, retrying once");
            if self.0.store.update_job(&job).await.is_err() {
                job.mark_failed(format!("store error: {e}"));
                let _ = self.0.store.update_job(&job).await;
            }
        }
    }

    async fn run_batch(&self, urls: Vec<String>, cancel: CancellationToken) -> Vec<ScrapeResult> {
        let mut set = tokio::task::JoinSet::new();
        for url in urls {
            let exec = self.clone();
            let cancel = cancel.clone();
            set.spawn(async move { exec.run_one_url(url, cancel).await });
        }

        let mut results = Vec::new();
        while let Some(joined) = set.join_next().await {
            if let Ok(result) = joined {
                results.push(result);
            }
        }
        results
    }

    async fn run_pagination(&self, seed_url: String, max_pages: u32, cancel: CancellationToken) -> Vec<ScrapeResult> {
        let mut worklist = vec![seed_url];
        let mut visited = HashSet::new();
        let mut results = Vec::new();

        while let Some(url) = worklist.pop() {
            if cancel.is_cancelled() {
                break;
            }
            if visited.len() as u32 >= max_pages {
                break;
            }
            let normalized = normalize(&url);
            if !visited.insert(normalized) {
                continue;
            }

            let result = self.run_one_url(url, cancel.clone()).await;
            let next = result.next_url.clone();
            results.push(result);

            if let Some(next_url) = next {
                if !next_url.is_empty() && (visited.len() as u32) < max_pages {
                    worklist.push(next_url);
                }
            }
        }

        results
    }

    async fn run_one_url(&self, url: String, cancel: CancellationToken) -> ScrapeResult {
        let host = match url::Url::parse(&url).ok().and_then(|u| u.host_str().map(str::to_string)) {
            Some(h) => h,
            None => return ScrapeResult::failure(url, "url empty or scheme/host invalid".to_string()),
        };

        let permit = tokio::select! {
            permit = self.0.admission.acquire(&host) => permit,
            _ = cancel.cancelled() => return ScrapeResult::failure(url, "job cancelled".to_string()),
        };

        let retry = RetryController::new(
            &self.0.breaker,
            RetryConfig {
                attempts: self.0.config.retry_attempts,
                base_delay: self.0.config.retry_base_delay,
            },
        );

        let strategy = self.0.strategy.clone();
        let fetch_url = url.clone();
        let started = Instant::now();
        let outcome = retry
            .run(&host, &cancel, || {
                let strategy = strategy.clone();
                let url = fetch_url.clone();
                let cancel = cancel.clone();
                async move { strategy.fetch(&url, &cancel).await }
            })
            .await;

        drop(permit);
        self.0
            .metrics
            .record(outcome.result.is_ok(), outcome.retries, started.elapsed());

        match outcome.result {
            Ok(o) => ScrapeResult::success(url, o.status_code, o.size, o.title, o.next_url),
            Err(e) => ScrapeResult::failure(url, e.to_string()),
        }
    }
}

fn normalize(url: &str) -> String {
    url::Url::parse(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scrape_core::JobStatus;
    use scrape_fetch::FetchOutcome;
    use scrape_store::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct ScriptedStrategy {
        calls: AtomicUsize,
        responses: Vec<Result<FetchOutcome, scrape_core::ScrapeError>>,
    }

    #[async_trait]
    impl FetchStrategy for ScriptedStrategy {
        async fn fetch(&self, url: &str, _cancel: &CancellationToken) -> Result<FetchOutcome, scrape_core::ScrapeError> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(i) {
                Some(r) => r.clone(),
                None => Err(scrape_core::ScrapeError::Transport {
                    url: url.to_string(),
                    message: "exhausted script".into(),
                }),
            }
        }
    }

    fn config() -> Config {
        Config {
            max_concurrent: 4,
            retry_attempts: 1,
            total_timeout: Duration::from_secs(5),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn batch_job_produces_one_result_per_url() {
        let strategy = Arc::new(ScriptedStrategy {
            calls: AtomicUsize::new(0),
            responses: vec![
                Ok(FetchOutcome { status_code: 200, size: 5, title: "A".into(), next_url: None }),
                Ok(FetchOutcome { status_code: 200, size: 5, title: "B".into(), next_url: None }),
            ],
        });
        let store = Arc::new(InMemoryStore::new());
        let metrics = Arc::new(scrape_core::MetricsRegistry::new(true));
        let executor = Executor::new(config(), strategy, store.clone(), metrics);

        let id = executor
            .submit(JobRequest::Batch {
                urls: vec!["http://a.example".into(), "http://b.example".into()],
            })
            .await
            .unwrap();

        let job = wait_for_terminal(&store, id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.results.len(), 2);
        assert_eq!(job.progress, 100);
    }

    #[tokio::test]
    async fn pagination_stops_at_max_pages() {
        let strategy = Arc::new(ScriptedStrategy {
            calls: AtomicUsize::new(0),
            responses: vec![
                Ok(FetchOutcome { status_code: 200, size: 1, title: "p1".into(), next_url: Some("http://a.example/p2".into()) }),
                Ok(FetchOutcome { status_code: 200, size: 1, title: "p2".into(), next_url: Some("http://a.example/p3".into()) }),
            ],
        });
        let store = Arc::new(InMemoryStore::new());
        let mut cfg = config();
        cfg.max_pages = 2;
        let metrics = Arc::new(scrape_core::MetricsRegistry::new(true));
        let executor = Executor::new(cfg, strategy, store.clone(), metrics);

        let id = executor
            .submit(JobRequest::Pagination {
                seed_url: "http://a.example/p1".into(),
                max_pages: 2,
            })
            .await
            .unwrap();

        let job = wait_for_terminal(&store, id).await;
        assert_eq!(job.results.len(), 2);
    }

    async fn wait_for_terminal(store: &Arc<InMemoryStore>, id: Uuid) -> Job {
        for _ in 0..200 {
            if let Some(job) = store.get_job(id).await.unwrap() {
                if matches!(job.status, JobStatus::Completed | JobStatus::Failed) {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job did not reach a terminal state in time");
    }
}
