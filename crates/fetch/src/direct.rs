use std::time::Duration;

use async_trait::async_trait;
use scrape_core::ScrapeError;
use tokio_util::sync::CancellationToken;

use crate::{validate_url, FetchOutcome, FetchStrategy};

/// GETs the URL directly via `reqwest`: compression enabled, bounded
/// timeout, custom UA.
pub struct DirectHttpStrategy {
    client: reqwest::Client,
}

impl DirectHttpStrategy {
    pub fn new(user_agent: &str, request_timeout: Duration) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(request_timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| ScrapeError::Build {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FetchStrategy for DirectHttpStrategy {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<FetchOutcome, ScrapeError> {
        validate_url(url)?;

        let response = tokio::select! {
            result = self.client.get(url).send() => {
                result.map_err(|e| classify(url, e))?
            }
            _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
        };

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(ScrapeError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = tokio::select! {
            result = response.text() => result.map_err(|e| classify(url, e))?,
            _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
        };

        let title = scrape_title::extract_title(&body, &content_type);

        Ok(FetchOutcome {
            status_code: status.as_u16(),
            size: body.len(),
            title,
            next_url: None,
        })
    }
}

fn classify(url: &str, err: reqwest::Error) -> ScrapeError {
    if err.is_builder() {
        ScrapeError::Build {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else {
        ScrapeError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_sane_defaults() {
        let strategy = DirectHttpStrategy::new("scrape-svc/0.1", Duration::from_secs(5));
        assert!(strategy.is_ok());
    }
}
