//! Retry controller: loops a single-URL fetch through the breaker, applying
//! bounded linear backoff. Classification is by the error's tag only.

use std::future::Future;
use std::time::Duration;

use scrape_breaker::BreakerRegistry;
use scrape_core::ScrapeError;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

pub struct RetryOutcome<T> {
    pub result: Result<T, ScrapeError>,
    /// Number of strategy invocations actually attempted (1 when the first
    /// try succeeds or fails non-retryably).
    pub attempts: u32,
    pub retries: u32,
}

pub struct RetryController<'a> {
    breaker: &'a BreakerRegistry,
    config: RetryConfig,
}

impl<'a> RetryController<'a> {
    pub fn new(breaker: &'a BreakerRegistry, config: RetryConfig) -> Self {
        Self { breaker, config }
    }

    /// Runs `attempt` (one strategy invocation, guarded by the per-host
    /// breaker) up to `config.attempts` times for `host`, honoring `cancel`
    /// during backoff sleeps.
    pub async fn run<F, Fut, T>(
        &self,
        host: &str,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScrapeError>>,
    {
        let mut attempt_number: u32 = 0;
        let mut retries = 0;

        loop {
            attempt_number += 1;
            let outcome = self.breaker.guard(host, || attempt()).await;

            match outcome {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt_number,
                        retries,
                    };
                }
                Err(err) if err.is_breaker_open() => {
                    return RetryOutcome {
                        result: Err(err),
                        attempts: attempt_number,
                        retries,
                    };
                }
                Err(err) if err.retryable() && attempt_number < self.config.attempts => {
                    retries += 1;
                    let delay = self.config.base_delay * attempt_number;
                    tracing::debug!(host, attempt_number, ?delay, "retrying after error");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => {
                            return RetryOutcome {
                                result: Err(ScrapeError::Cancelled),
                                attempts: attempt_number,
                                retries,
                            };
                        }
                    }
                }
                Err(err) => {
                    return RetryOutcome {
                        result: Err(err),
                        attempts: attempt_number,
                        retries,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrape_breaker::BreakerConfig;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transport_err() -> ScrapeError {
        ScrapeError::Transport {
            url: "http://x".into(),
            message: "reset".into(),
        }
    }

    #[tokio::test]
    async fn retry_attempts_one_means_no_retry() {
        let breaker = BreakerRegistry::new(BreakerConfig::default());
        let controller = RetryController::new(
            &breaker,
            RetryConfig {
                attempts: 1,
                base_delay: Duration::from_millis(1),
            },
        );
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let outcome = controller
            .run("h", &cancel, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(transport_err()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.result.is_err());
    }

    #[tokio::test]
    async fn succeeds_after_two_retryable_failures() {
        let breaker = BreakerRegistry::new(BreakerConfig {
            failure_threshold: 100,
            ..Default::default()
        });
        let controller = RetryController::new(
            &breaker,
            RetryConfig {
                attempts: 3,
                base_delay: Duration::from_millis(1),
            },
        );
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let outcome = controller
            .run("h", &cancel, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(transport_err())
                    } else {
                        Ok(200u16)
                    }
                }
            })
            .await;

        assert_eq!(outcome.retries, 2);
        assert_eq!(outcome.result.unwrap(), 200);
    }

    #[tokio::test]
    async fn breaker_open_aborts_without_retry() {
        let breaker = BreakerRegistry::new(BreakerConfig {
            failure_threshold: 1,
            ..Default::default()
        });
        let controller = RetryController::new(
            &breaker,
            RetryConfig {
                attempts: 5,
                base_delay: Duration::from_millis(1),
            },
        );
        let cancel = CancellationToken::new();

        let first = controller
            .run("h", &cancel, || async { Err::<(), _>(transport_err()) })
            .await;
        assert!(first.result.is_err());

        let calls = AtomicU32::new(0);
        let second = controller
            .run("h", &cancel, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, ScrapeError>(()) }
            })
            .await;

        assert!(matches!(second.result, Err(ScrapeError::BreakerOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
