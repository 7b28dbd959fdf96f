//! Pluggable single-URL fetch strategies. Selection is per-process
//! (configured at construction), never per-URL.

mod direct;
mod headless;

pub use direct::DirectHttpStrategy;
pub use headless::HeadlessStrategy;

use async_trait::async_trait;
use scrape_core::ScrapeError;
use tokio_util::sync::CancellationToken;

/// Result of a single successful fetch attempt, before the retry controller
/// or executor attach timing metadata.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub status_code: u16,
    pub size: usize,
    pub title: String,
    pub next_url: Option<String>,
}

/// A single fetch attempt for one URL. Implementations perform exactly one
/// attempt; retrying is the retry controller's job.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<FetchOutcome, ScrapeError>;
}

pub(crate) fn validate_url(url: &str) -> Result<url::Url, ScrapeError> {
    if url.trim().is_empty() {
        return Err(ScrapeError::Validation("url is empty".to_string()));
    }
    let parsed = url::Url::parse(url).map_err(|e| ScrapeError::Build {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ScrapeError::Validation(format!(
            "unsupported scheme {:?} for {url}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none() {
        return Err(ScrapeError::Validation(format!("missing host for {url}")));
    }
    Ok(parsed)
}
