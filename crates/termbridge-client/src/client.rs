//! The client request engine.
//!
//! Every call checks the local cache first, then issues an HTTP request to
//! the bridge. Transient failures (connection errors, timeouts, rate-limit
//! rejections, transient upstream reason codes) are retried with exponential
//! backoff up to the configured bound, honoring a server-provided
//! `Retry-After` when it is longer than the computed delay. Non-transient
//! failures surface immediately.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use termbridge_core::{
    BarSeries, BarsResponse, BridgeError, CacheMode, DataResponse, HealthResponse,
    HistoricalQuery, IntradayQuery, QueryFingerprint, QueryResult, ReferenceQuery, ResponseCache,
    UpstreamReason, API_KEY_HEADER,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::ClientConfig;
use crate::error::ClientError;

#[derive(Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    config: ClientConfig,
    cache: ResponseCache,
}

impl BridgeClient {
    /// Builder failure would mean the configured timeout is not enforced,
    /// so it surfaces as an error instead of degrading to a default client.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent("termbridge-client/0.1.0")
            .build()?;
        let cache = ResponseCache::new(config.cache_ttl, config.cache_max_entries);
        Ok(Self {
            http,
            config,
            cache,
        })
    }

    /// Fetch historical data, using the local cache by default.
    pub async fn historical(&self, query: &HistoricalQuery) -> Result<QueryResult, ClientError> {
        self.historical_with_mode(query, CacheMode::default()).await
    }

    pub async fn historical_with_mode(
        &self,
        query: &HistoricalQuery,
        mode: CacheMode,
    ) -> Result<QueryResult, ClientError> {
        self.fetch_cached("/v1/historical", query, query.fingerprint(), mode)
            .await
    }

    /// Fetch current/static reference data.
    pub async fn reference(&self, query: &ReferenceQuery) -> Result<QueryResult, ClientError> {
        self.reference_with_mode(query, CacheMode::default()).await
    }

    pub async fn reference_with_mode(
        &self,
        query: &ReferenceQuery,
        mode: CacheMode,
    ) -> Result<QueryResult, ClientError> {
        self.fetch_cached("/v1/reference", query, query.fingerprint(), mode)
            .await
    }

    /// Fetch intraday bars. Never cached on either side; every call goes
    /// over the wire, with the usual transient-failure retry.
    pub async fn intraday(&self, query: &IntradayQuery) -> Result<BarSeries, ClientError> {
        let response: BarsResponse = self.execute("/v1/intraday", query).await?;
        Ok(BarSeries::new(response.source, response.bars))
    }

    /// Dispatch several historical queries with bounded concurrency.
    ///
    /// Results come back in input order; each entry succeeds or fails on its
    /// own.
    pub async fn historical_batch(
        &self,
        queries: Vec<HistoricalQuery>,
    ) -> Vec<Result<QueryResult, ClientError>> {
        let total = queries.len();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut workers = JoinSet::new();

        for (index, query) in queries.into_iter().enumerate() {
            let client = self.clone();
            let semaphore = Arc::clone(&semaphore);
            workers.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("batch semaphore is never closed");
                (index, client.historical(&query).await)
            });
        }

        let mut slots: Vec<Option<Result<QueryResult, ClientError>>> =
            (0..total).map(|_| None).collect();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(join_error) => {
                    tracing::error!("batch worker panicked: {join_error}");
                }
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(ClientError::Worker(String::from("worker lost")))))
            .collect()
    }

    /// Probe the bridge's health endpoint (no credential required).
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = format!("{}/health", self.config.base_url);
        let attempt = async {
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(map_transport_error)?;
            if !response.status().is_success() {
                return Err(BridgeError::upstream(
                    UpstreamReason::ServiceDown,
                    format!("health endpoint returned {}", response.status()),
                ));
            }
            response.json::<HealthResponse>().await.map_err(|error| {
                BridgeError::upstream(
                    UpstreamReason::Rejected,
                    format!("malformed health payload: {error}"),
                )
            })
        };
        attempt.await.map_err(|error| ClientError::Request {
            error,
            attempts: 1,
        })
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    async fn fetch_cached<Q: Serialize>(
        &self,
        path: &str,
        query: &Q,
        fingerprint: QueryFingerprint,
        mode: CacheMode,
    ) -> Result<QueryResult, ClientError> {
        if mode == CacheMode::Use {
            if let Some(result) = self.cache.get(&fingerprint).await {
                tracing::debug!(fingerprint = %fingerprint, "local cache hit");
                return Ok(result);
            }
        }

        let response: DataResponse = self.execute(path, query).await?;
        let result = QueryResult::new(response.source, response.rows);

        if mode != CacheMode::Bypass {
            self.cache.put(fingerprint, result.clone()).await;
        }
        Ok(result)
    }

    /// The retry loop: one explicit attempt counter, one computed delay.
    async fn execute<Q, R>(&self, path: &str, query: &Q) -> Result<R, ClientError>
    where
        Q: Serialize,
        R: DeserializeOwned,
    {
        let mut attempt: u32 = 0;
        loop {
            match self.send_once(path, query).await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    if !error.is_transient() || attempt >= self.config.retry.max_retries {
                        return Err(ClientError::Request {
                            error,
                            attempts: attempt + 1,
                        });
                    }

                    let mut delay = self.config.retry.delay_for_attempt(attempt);
                    if let Some(retry_after) = error.retry_after() {
                        delay = delay.max(retry_after);
                    }
                    tracing::debug!(
                        code = error.code(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "transient failure, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn send_once<Q, R>(&self, path: &str, query: &Q) -> Result<R, BridgeError>
    where
        Q: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.config.base_url, path);
        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(query)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return response.json::<R>().await.map_err(|error| {
                BridgeError::upstream(
                    UpstreamReason::Rejected,
                    format!("malformed bridge payload: {error}"),
                )
            });
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();

        if let Ok(error_body) = serde_json::from_str::<termbridge_core::ErrorBody>(&body) {
            return Err(BridgeError::from_wire(
                &error_body.error.code,
                error_body.error.message,
                retry_after,
            ));
        }

        // No structured body; fall back to status-class mapping.
        Err(match status.as_u16() {
            401 | 403 => BridgeError::auth("bridge rejected the credential"),
            429 => BridgeError::rate_limited(retry_after.unwrap_or(Duration::from_secs(1))),
            400 => BridgeError::malformed(format!("bridge rejected the request: {status}")),
            code if code >= 500 => BridgeError::upstream(
                UpstreamReason::ServiceDown,
                format!("bridge returned status {code}"),
            ),
            code => BridgeError::upstream(
                UpstreamReason::Rejected,
                format!("bridge returned unexpected status {code}"),
            ),
        })
    }
}

fn map_transport_error(error: reqwest::Error) -> BridgeError {
    if error.is_timeout() {
        BridgeError::upstream(UpstreamReason::Timeout, "bridge request timed out")
    } else {
        BridgeError::upstream(
            UpstreamReason::ConnectionLost,
            format!("bridge connection failed: {error}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termbridge_core::RetryConfig;

    #[test]
    fn client_is_cheap_to_clone_for_batch_workers() {
        let client = BridgeClient::new(
            ClientConfig::new("http://localhost:9", "test-key")
                .with_retry(RetryConfig::no_retry()),
        )
        .unwrap();
        let clone = client.clone();
        assert_eq!(clone.config.base_url, client.config.base_url);
    }

    #[test]
    fn construction_surfaces_builder_outcome_instead_of_degrading() {
        // A valid config must build; an Err here would mean the timeout was
        // silently dropped, which new() no longer permits.
        let config = ClientConfig::new("http://localhost:8080", "test-key")
            .with_timeout(Duration::from_millis(250));
        assert!(BridgeClient::new(config).is_ok());
    }

    #[tokio::test]
    async fn connection_failure_is_transient_and_annotated_with_attempts() {
        // Port 9 (discard) is not listening; connect fails fast.
        let config = ClientConfig::new("http://127.0.0.1:9", "test-key")
            .with_retry(RetryConfig::fixed(Duration::from_millis(5), 2))
            .with_timeout(Duration::from_millis(500));
        let client = BridgeClient::new(config).unwrap();

        let query = sample_query();
        let error = client.historical(&query).await.unwrap_err();
        assert_eq!(error.attempts(), Some(3));
        let bridge_error = error.bridge_error().unwrap();
        assert!(bridge_error.is_transient());
    }

    fn sample_query() -> HistoricalQuery {
        use termbridge_core::{FieldCode, MarketDate, Security};
        HistoricalQuery::new(
            vec![Security::parse("AAPL US Equity").unwrap()],
            vec![FieldCode::parse("PX_LAST").unwrap()],
            MarketDate::parse("2024-01-01").unwrap(),
            MarketDate::parse("2024-01-02").unwrap(),
        )
        .unwrap()
    }
}
