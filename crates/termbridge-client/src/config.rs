use std::time::Duration;

use termbridge_core::RetryConfig;

/// Client engine settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bridge server base URL, e.g. `http://localhost:8080`.
    pub base_url: String,
    pub api_key: String,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    pub retry: RetryConfig,
    /// TTL of the client's local cache, independent from the server's.
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    /// Upper bound on concurrent requests during batch dispatch.
    pub max_concurrency: usize,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            cache_ttl: Duration::from_secs(300),
            cache_max_entries: 1000,
            max_concurrency: 8,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_stripped_from_base_url() {
        let config = ClientConfig::new("http://localhost:8080//", "key");
        assert_eq!(config.base_url, "http://localhost:8080");
    }
}
