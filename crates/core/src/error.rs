use thiserror::Error;

/// Error taxonomy shared across the fetch strategy, breaker, retry controller
/// and executor. Classification is by tag only, never by message or body.
#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    #[error("url empty or scheme/host invalid: {0}")]
    Validation(String),

    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("http {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("invalid request for {url}: {message}")]
    Build { url: String, message: String },

    #[error("breaker open for host {host}")]
    BreakerOpen { host: String },

    #[error("job cancelled")]
    Cancelled,

    #[error("store error: {0}")]
    Store(String),
}

impl ScrapeError {
    /// Whether the retry controller may attempt this URL again.
    pub fn retryable(&self) -> bool {
        match self {
            ScrapeError::Transport { .. } => true,
            ScrapeError::Http { status, .. } => {
                matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            ScrapeError::Validation(_)
            | ScrapeError::Build { .. }
            | ScrapeError::BreakerOpen { .. }
            | ScrapeError::Cancelled
            | ScrapeError::Store(_) => false,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ScrapeError::Transport { url, .. }
            | ScrapeError::Http { url, .. }
            | ScrapeError::Build { url, .. } => Some(url),
            _ => None,
        }
    }

    pub fn is_breaker_open(&self) -> bool {
        matches!(self, ScrapeError::BreakerOpen { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_is_retryable() {
        let e = ScrapeError::Transport {
            url: "http://x".into(),
            message: "reset".into(),
        };
        assert!(e.retryable());
    }

    #[test]
    fn http_503_is_retryable_but_404_is_not() {
        let retry = ScrapeError::Http {
            url: "http://x".into(),
            status: 503,
        };
        let no_retry = ScrapeError::Http {
            url: "http://x".into(),
            status: 404,
        };
        assert!(retry.retryable());
        assert!(!no_retry.retryable());
    }

    #[test]
    fn breaker_open_never_retryable() {
        let e = ScrapeError::BreakerOpen { host: "x".into() };
        assert!(!e.retryable());
        assert!(e.is_breaker_open());
    }
}
