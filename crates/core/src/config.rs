use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::error::ConfigError;

/// Process-wide configuration, fixed at startup. Populated from environment
/// variables under the `SCRAPE_` prefix; the CLI layer may override
/// individual fields from flags before the config is frozen.
#[derive(Debug, Clone)]
pub struct Config {
    pub max_concurrent: usize,
    pub per_host_limits: HashMap<String, usize>,
    pub request_timeout: Duration,
    pub total_timeout: Duration,
    pub retry_attempts: u32,
    pub retry_base_delay: Duration,
    pub breaker_failure_threshold: u32,
    pub breaker_reset_timeout: Duration,
    pub breaker_halfopen_probe_count: u32,
    pub user_agent: String,
    pub use_headless: bool,
    pub max_pages: u32,
    pub store_addr: Option<String>,
    pub metrics_enabled: bool,
    pub bind_addr: String,
    pub browser_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent: 16,
            per_host_limits: HashMap::new(),
            request_timeout: Duration::from_secs(15),
            total_timeout: Duration::from_secs(120),
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(250),
            breaker_failure_threshold: 5,
            breaker_reset_timeout: Duration::from_secs(30),
            breaker_halfopen_probe_count: 1,
            user_agent: "scrape-svc/0.1".to_string(),
            use_headless: false,
            max_pages: 10,
            store_addr: None,
            metrics_enabled: true,
            bind_addr: "0.0.0.0:8080".to_string(),
            browser_url: None,
        }
    }
}

impl Config {
    /// Reads `SCRAPE_*` environment variables over the defaults. Absence of
    /// `SCRAPE_REDIS_ADDR` means the in-memory job store is selected.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(v) = env_usize("SCRAPE_MAX_CONCURRENT")? {
            cfg.max_concurrent = v;
        }
        if let Some(v) = env_u64("SCRAPE_REQUEST_TIMEOUT")? {
            cfg.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_u64("SCRAPE_TOTAL_TIMEOUT")? {
            cfg.total_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_u32("SCRAPE_RETRY_ATTEMPTS")? {
            cfg.retry_attempts = v;
        }
        if let Some(v) = env_u64("SCRAPE_RETRY_BASE_DELAY_MS")? {
            cfg.retry_base_delay = Duration::from_millis(v);
        }
        if let Some(v) = env_u32("SCRAPE_CIRCUIT_BREAKER_THRESHOLD")? {
            cfg.breaker_failure_threshold = v;
        }
        if let Some(v) = env_u64("SCRAPE_CIRCUIT_BREAKER_TIMEOUT")? {
            cfg.breaker_reset_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_u32("SCRAPE_CIRCUIT_BREAKER_HALFOPEN_PROBES")? {
            cfg.breaker_halfopen_probe_count = v;
        }
        if let Ok(v) = env::var("SCRAPE_USER_AGENT") {
            cfg.user_agent = v;
        }
        if let Some(v) = env_bool("SCRAPE_USE_HEADLESS")? {
            cfg.use_headless = v;
        }
        if let Some(v) = env_u32("SCRAPE_MAX_PAGES")? {
            cfg.max_pages = v;
        }
        if let Ok(v) = env::var("SCRAPE_REDIS_ADDR") {
            cfg.store_addr = Some(v);
        }
        if let Some(v) = env_bool("SCRAPE_METRICS_ENABLED")? {
            cfg.metrics_enabled = v;
        }
        if let Ok(v) = env::var("SCRAPE_BIND_ADDR") {
            cfg.bind_addr = v;
        }
        if let Ok(v) = env::var("SCRAPE_BROWSER_URL") {
            cfg.browser_url = Some(v);
        }
        if let Ok(v) = env::var("SCRAPE_PER_HOST_LIMITS") {
            cfg.per_host_limits = parse_per_host_limits(&v)?;
        }

        Ok(cfg)
    }
}

/// Parses `host=limit,host2=limit2` into a map, as read from
/// `SCRAPE_PER_HOST_LIMITS`.
fn parse_per_host_limits(raw: &str) -> Result<HashMap<String, usize>, ConfigError> {
    let mut map = HashMap::new();
    for entry in raw.split(',').filter(|s| !s.trim().is_empty()) {
        let (host, limit) = entry.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
            key: "SCRAPE_PER_HOST_LIMITS".to_string(),
            value: entry.to_string(),
        })?;
        let limit: usize = limit.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: "SCRAPE_PER_HOST_LIMITS".to_string(),
            value: entry.to_string(),
        })?;
        map.insert(host.trim().to_string(), limit);
    }
    Ok(map)
}

fn env_usize(key: &str) -> Result<Option<usize>, ConfigError> {
    env_parse(key)
}

fn env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    env_parse(key)
}

fn env_u32(key: &str) -> Result<Option<u32>, ConfigError> {
    env_parse(key)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value: v }),
        Err(_) => Ok(None),
    }
}

fn env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue { key: key.to_string(), value: v }),
        },
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn default_config_has_no_store_addr() {
        let cfg = Config::default();
        assert!(cfg.store_addr.is_none());
        assert_eq!(cfg.breaker_halfopen_probe_count, 1);
    }

    #[test]
    fn from_env_overrides_max_concurrent() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("SCRAPE_MAX_CONCURRENT", "42");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.max_concurrent, 42);
        env::remove_var("SCRAPE_MAX_CONCURRENT");
    }

    #[test]
    fn per_host_limits_parses_pairs() {
        let map = parse_per_host_limits("a.example=2, b.example=5").unwrap();
        assert_eq!(map.get("a.example"), Some(&2));
        assert_eq!(map.get("b.example"), Some(&5));
    }

    #[test]
    fn per_host_limits_rejects_malformed_entry() {
        assert!(parse_per_host_limits("a.example").is_err());
    }
}
