//! Headless-browser fetch strategy: launch/connect, navigate, wait for the
//! page to settle, extract.

#[cfg(feature = "browser")]
mod imp {
    use std::time::Duration;

    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
    use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
    use chromiumoxide::handler::HandlerConfig;
    use chromiumoxide::Page;
    use futures::StreamExt;
    use scrape_core::ScrapeError;
    use tokio::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    use crate::{validate_url, FetchOutcome, FetchStrategy};

    const SETTLE_DELAY: Duration = Duration::from_secs(3);
    const STEALTH_ARGS: &[&str] = &[
        "--disable-blink-features=AutomationControlled",
        "--disable-infobars",
        "--disable-dev-shm-usage",
        "--no-first-run",
        "--no-default-browser-check",
        "--no-sandbox",
        "--disable-gpu",
        "--disable-software-rasterizer",
    ];

    const WAIT_FOR_READY_SCRIPT: &str = r#"
        new Promise((resolve) => {
            if (document.readyState === 'complete' || document.readyState === 'interactive') {
                resolve(document.readyState);
            } else {
                document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
                setTimeout(() => resolve('timeout'), 10000);
            }
        })
    "#;

    const NEXT_LINK_SCRIPT: &str = r#"
        (() => {
            const a = document.querySelector('li.next a');
            return a ? a.getAttribute('href') : null;
        })()
    "#;

    /// Launches (or connects to) a headless browser session shared across
    /// fetches; each fetch opens and closes its own isolated page.
    pub struct HeadlessStrategy {
        remote_url: Option<String>,
        request_timeout: Duration,
        browser: Mutex<Option<Browser>>,
    }

    impl HeadlessStrategy {
        pub fn new(remote_url: Option<String>, request_timeout: Duration) -> Self {
            Self {
                remote_url,
                request_timeout,
                browser: Mutex::new(None),
            }
        }

        async fn ensure_browser(&self) -> Result<(), ScrapeError> {
            let mut guard = self.browser.lock().await;
            if guard.is_some() {
                return Ok(());
            }

            let (browser, mut handler) = match &self.remote_url {
                Some(url) => Browser::connect_with_config(url, HandlerConfig::default())
                    .await
                    .map_err(|e| transport(url, e))?,
                None => {
                    let config = BrowserConfig::builder()
                        .headless_mode(HeadlessMode::True)
                        .no_sandbox()
                        .args(STEALTH_ARGS.iter().map(|s| s.to_string()))
                        .request_timeout(self.request_timeout)
                        .build()
                        .map_err(|e| ScrapeError::Build {
                            url: String::new(),
                            message: e,
                        })?;
                    Browser::launch(config)
                        .await
                        .map_err(|e| transport("launch", e))?
                }
            };

            tokio::spawn(async move { while handler.next().await.is_some() {} });
            *guard = Some(browser);
            Ok(())
        }

        async fn fetch_inner(&self, page: &Page, url: &str) -> Result<FetchOutcome, ScrapeError> {
            let nav = NavigateParams::builder()
                .url(url)
                .build()
                .map_err(|e| ScrapeError::Build {
                    url: url.to_string(),
                    message: e,
                })?;

            tokio::time::timeout(self.request_timeout, page.execute(nav))
                .await
                .map_err(|_| ScrapeError::Transport {
                    url: url.to_string(),
                    message: "navigation timed out".to_string(),
                })?
                .map_err(|e| transport(url, e))?;

            let ready_timeout = self.request_timeout;
            match tokio::time::timeout(ready_timeout, page.evaluate(WAIT_FOR_READY_SCRIPT)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::debug!(url, error = %e, "page ready check failed"),
                Err(_) => tracing::warn!(url, "timed out waiting for page ready state"),
            }

            tokio::time::sleep(SETTLE_DELAY).await;

            let title = page
                .get_title()
                .await
                .ok()
                .flatten()
                .filter(|t| !t.trim().is_empty() && !looks_generic(t))
                .unwrap_or_default();

            let content = page.content().await.map_err(|e| transport(url, e))?;

            let title = if title.is_empty() {
                derive_title_from_body(&content)
            } else {
                title
            };

            let next_href: Option<String> = page
                .evaluate(NEXT_LINK_SCRIPT)
                .await
                .ok()
                .and_then(|v| v.into_value().ok());

            let next_url = next_href.and_then(|href| {
                url::Url::parse(url)
                    .ok()
                    .and_then(|base| base.join(&href).ok())
                    .map(|u| u.to_string())
            });

            Ok(FetchOutcome {
                status_code: 200,
                size: content.len(),
                title,
                next_url,
            })
        }
    }

    fn looks_generic(title: &str) -> bool {
        let lower = title.to_ascii_lowercase();
        lower.is_empty() || lower == "untitled" || lower.starts_with("error")
    }

    fn derive_title_from_body(html: &str) -> String {
        let fallback = scrape_title::extract_title(html, "text/html");
        if fallback.starts_with("No HTML title") || fallback.starts_with("Malformed") || fallback.starts_with("Empty") {
            "Untitled page".to_string()
        } else {
            truncate(&fallback, 100)
        }
    }

    fn truncate(s: &str, max: usize) -> String {
        if s.len() <= max {
            s.to_string()
        } else {
            s.chars().take(max).collect()
        }
    }

    fn transport(url: &str, err: impl std::fmt::Display) -> ScrapeError {
        ScrapeError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    #[async_trait]
    impl FetchStrategy for HeadlessStrategy {
        async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<FetchOutcome, ScrapeError> {
            validate_url(url)?;
            self.ensure_browser().await?;

            let guard = self.browser.lock().await;
            let browser = guard.as_ref().expect("ensure_browser populates this");
            let page = browser.new_page("about:blank").await.map_err(|e| transport(url, e))?;

            let result = tokio::select! {
                res = self.fetch_inner(&page, url) => res,
                _ = cancel.cancelled() => Err(ScrapeError::Cancelled),
            };
            let _ = page.close().await;
            result
        }
    }
}

#[cfg(not(feature = "browser"))]
mod imp {
    use std::time::Duration;

    use async_trait::async_trait;
    use scrape_core::ScrapeError;
    use tokio_util::sync::CancellationToken;

    use crate::{FetchOutcome, FetchStrategy};

    /// Stub used when the `browser` feature is disabled at build time.
    pub struct HeadlessStrategy;

    impl HeadlessStrategy {
        pub fn new(_remote_url: Option<String>, _request_timeout: Duration) -> Self {
            Self
        }
    }

    #[async_trait]
    impl FetchStrategy for HeadlessStrategy {
        async fn fetch(&self, url: &str, _cancel: &CancellationToken) -> Result<FetchOutcome, ScrapeError> {
            Err(ScrapeError::Transport {
                url: url.to_string(),
                message: "headless strategy unavailable: built without the browser feature".to_string(),
            })
        }
    }
}

pub use imp::HeadlessStrategy;
