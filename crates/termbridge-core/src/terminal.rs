//! Upstream terminal adapters.
//!
//! The terminal's native data API is an opaque collaborator, modeled as the
//! [`Terminal`] capability: fetch security/field data for a date range, or
//! fail with a typed reason. [`connect`] probes the terminal gateway once at
//! startup and picks the live adapter or the deterministic mock; the chosen
//! mode is fixed for the process lifetime and queryable via
//! [`Terminal::mode`].

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use time::{OffsetDateTime, Weekday};

use crate::error::{BridgeError, UpstreamReason};
use crate::query::{HistoricalQuery, IntradayQuery, MarketDate, MarketDateTime, ReferenceQuery};
use crate::result::{Bar, BarSeries, DataOrigin, FieldValue, QueryResult, QueryRow};

/// Whether the bridge is serving real terminal data or synthetic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    Live,
    Mock,
}

impl ServiceMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Mock => "mock",
        }
    }
}

impl std::fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for the terminal's local data gateway.
#[derive(Debug, Clone)]
pub struct TerminalConfig {
    pub gateway_host: String,
    pub gateway_port: u16,
    /// Upper bound for any single upstream fetch.
    pub timeout: Duration,
    /// Daily variation band for synthetic values, e.g. 0.02 for +/- 2%.
    pub mock_variance: f64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            gateway_host: String::from("localhost"),
            gateway_port: 8194,
            timeout: Duration::from_secs(30),
            mock_variance: 0.02,
        }
    }
}

/// The upstream fetch capability.
pub trait Terminal: Send + Sync {
    fn mode(&self) -> ServiceMode;

    fn historical<'a>(
        &'a self,
        query: &'a HistoricalQuery,
    ) -> Pin<Box<dyn Future<Output = Result<QueryResult, BridgeError>> + Send + 'a>>;

    fn reference<'a>(
        &'a self,
        query: &'a ReferenceQuery,
    ) -> Pin<Box<dyn Future<Output = Result<QueryResult, BridgeError>> + Send + 'a>>;

    fn intraday<'a>(
        &'a self,
        query: &'a IntradayQuery,
    ) -> Pin<Box<dyn Future<Output = Result<BarSeries, BridgeError>> + Send + 'a>>;
}

/// One-shot reachability probe against the gateway's TCP endpoint.
pub async fn probe_gateway(host: &str, port: u16, timeout: Duration) -> bool {
    let address = format!("{host}:{port}");
    matches!(
        tokio::time::timeout(timeout, tokio::net::TcpStream::connect(&address)).await,
        Ok(Ok(_))
    )
}

/// Probe the gateway and build the matching adapter.
pub async fn connect(config: &TerminalConfig) -> Arc<dyn Terminal> {
    let reachable = probe_gateway(
        &config.gateway_host,
        config.gateway_port,
        config.timeout.min(Duration::from_secs(3)),
    )
    .await;

    if reachable {
        match GatewayTerminal::new(config) {
            Ok(gateway) => {
                tracing::info!(
                    host = %config.gateway_host,
                    port = config.gateway_port,
                    "terminal gateway reachable, serving live data"
                );
                return Arc::new(gateway);
            }
            Err(error) => {
                tracing::error!("failed to build gateway http client: {error}");
            }
        }
    } else {
        tracing::warn!(
            host = %config.gateway_host,
            port = config.gateway_port,
            "terminal gateway unreachable"
        );
    }
    tracing::warn!("serving deterministic mock data");
    Arc::new(MockTerminal::new(config.mock_variance))
}

#[derive(Debug, Deserialize)]
struct GatewayRows {
    rows: Vec<QueryRow>,
}

#[derive(Debug, Deserialize)]
struct GatewayBars {
    bars: Vec<Bar>,
}

#[derive(Debug, Deserialize)]
struct GatewayFailure {
    code: String,
    message: String,
}

/// Live adapter speaking to the terminal's local data gateway over HTTP.
///
/// Gateway failures are mapped to typed upstream reasons and surfaced as-is;
/// live mode never falls back to synthetic data mid-request.
pub struct GatewayTerminal {
    client: reqwest::Client,
    base_url: String,
}

impl GatewayTerminal {
    /// Builder failure here means the configured timeout cannot be
    /// enforced, so it is propagated instead of downgrading the client.
    pub fn new(config: &TerminalConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent("termbridge/0.1.0")
            .build()?;
        Ok(Self {
            client,
            base_url: format!("http://{}:{}", config.gateway_host, config.gateway_port),
        })
    }

    async fn post<T, R>(&self, endpoint: &str, query: &T) -> Result<R, BridgeError>
    where
        T: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        let url = format!("{}/refdata/{endpoint}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(query)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_gateway_failure(status.as_u16(), &body));
        }

        response.json().await.map_err(|error| {
            BridgeError::upstream(
                UpstreamReason::Rejected,
                format!("gateway returned malformed payload: {error}"),
            )
        })
    }

    async fn fetch<T: serde::Serialize>(
        &self,
        endpoint: &str,
        query: &T,
    ) -> Result<QueryResult, BridgeError> {
        let payload: GatewayRows = self.post(endpoint, query).await?;
        Ok(QueryResult::new(DataOrigin::Live, payload.rows))
    }
}

impl Terminal for GatewayTerminal {
    fn mode(&self) -> ServiceMode {
        ServiceMode::Live
    }

    fn historical<'a>(
        &'a self,
        query: &'a HistoricalQuery,
    ) -> Pin<Box<dyn Future<Output = Result<QueryResult, BridgeError>> + Send + 'a>> {
        Box::pin(async move { self.fetch("historical", query).await })
    }

    fn reference<'a>(
        &'a self,
        query: &'a ReferenceQuery,
    ) -> Pin<Box<dyn Future<Output = Result<QueryResult, BridgeError>> + Send + 'a>> {
        Box::pin(async move { self.fetch("reference", query).await })
    }

    fn intraday<'a>(
        &'a self,
        query: &'a IntradayQuery,
    ) -> Pin<Box<dyn Future<Output = Result<BarSeries, BridgeError>> + Send + 'a>> {
        Box::pin(async move {
            let payload: GatewayBars = self.post("intraday", query).await?;
            Ok(BarSeries::new(DataOrigin::Live, payload.bars))
        })
    }
}

fn map_transport_error(error: reqwest::Error) -> BridgeError {
    if error.is_timeout() {
        BridgeError::upstream(UpstreamReason::Timeout, "terminal gateway timed out")
    } else {
        BridgeError::upstream(
            UpstreamReason::ConnectionLost,
            format!("terminal gateway connection failed: {error}"),
        )
    }
}

fn map_gateway_failure(status: u16, body: &str) -> BridgeError {
    if let Ok(failure) = serde_json::from_str::<GatewayFailure>(body) {
        let reason = match failure.code.as_str() {
            "unknown_security" | "bad_security" => UpstreamReason::UnknownSecurity,
            "unknown_field" | "bad_field" => UpstreamReason::UnknownField,
            "not_logged_in" | "session_down" => UpstreamReason::NotLoggedIn,
            "license_restricted" | "entitlement" => UpstreamReason::LicenseRestricted,
            "timeout" => UpstreamReason::Timeout,
            _ if status >= 500 => UpstreamReason::ServiceDown,
            _ => UpstreamReason::Rejected,
        };
        return BridgeError::upstream(reason, failure.message);
    }

    if status >= 500 {
        BridgeError::upstream(
            UpstreamReason::ServiceDown,
            format!("terminal gateway returned status {status}"),
        )
    } else {
        BridgeError::upstream(
            UpstreamReason::Rejected,
            format!("terminal gateway rejected the request with status {status}"),
        )
    }
}

/// Synthetic data source used when the terminal is unreachable.
///
/// Values are a pure function of (security, field, date): a base price
/// derived from the (security, field) pair, shifted by a daily variation
/// within the configured band. Repeated identical queries always produce
/// identical rows. Weekends carry no observations, matching the terminal's
/// daily periodicity.
pub struct MockTerminal {
    variance: f64,
    fetches: AtomicU64,
}

impl MockTerminal {
    pub fn new(variance: f64) -> Self {
        Self {
            variance: variance.abs(),
            fetches: AtomicU64::new(0),
        }
    }

    /// Number of fetches served; lets tests assert that a code path never
    /// reached the upstream.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    fn value_for(&self, security: &str, field: &str, date: MarketDate) -> f64 {
        let base = base_price(security, field);
        let ratio = unit_interval(&[security, field, &date.to_string()]) * 2.0 - 1.0;
        round4(base * (1.0 + ratio * self.variance))
    }

    fn bar_for(&self, security: &str, time: MarketDateTime) -> Bar {
        let key = time.to_string();
        let base = base_price(security, "PX_LAST");
        let open_ratio = unit_interval(&[security, "open", &key]) * 2.0 - 1.0;
        let close_ratio = unit_interval(&[security, "close", &key]) * 2.0 - 1.0;
        let open = round4(base * (1.0 + open_ratio * self.variance));
        let close = round4(base * (1.0 + close_ratio * self.variance));
        // High/low straddle the open/close envelope by a fraction of the band.
        let spread = unit_interval(&[security, "spread", &key]) * self.variance * 0.5;
        Bar {
            time,
            open,
            high: round4(open.max(close) * (1.0 + spread)),
            low: round4(open.min(close) * (1.0 - spread)),
            close,
            volume: 10_000 + seed64(&[security, "volume", &key]) % 240_000,
            events: 50 + (seed64(&[security, "events", &key]) % 950) as u32,
        }
    }
}

impl Default for MockTerminal {
    fn default() -> Self {
        Self::new(0.02)
    }
}

impl Terminal for MockTerminal {
    fn mode(&self) -> ServiceMode {
        ServiceMode::Mock
    }

    fn historical<'a>(
        &'a self,
        query: &'a HistoricalQuery,
    ) -> Pin<Box<dyn Future<Output = Result<QueryResult, BridgeError>> + Send + 'a>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);

            let mut rows = Vec::new();
            for security in &query.securities {
                let mut date = Some(query.start_date);
                while let Some(current) = date {
                    if current > query.end_date {
                        break;
                    }
                    if !is_weekend(current) {
                        for field in &query.fields {
                            rows.push(QueryRow {
                                security: security.clone(),
                                field: field.clone(),
                                date: current,
                                value: FieldValue::Number(self.value_for(
                                    security.as_str(),
                                    field.as_str(),
                                    current,
                                )),
                            });
                        }
                    }
                    date = current.next_day();
                }
            }
            Ok(QueryResult::new(DataOrigin::Mock, rows))
        })
    }

    fn reference<'a>(
        &'a self,
        query: &'a ReferenceQuery,
    ) -> Pin<Box<dyn Future<Output = Result<QueryResult, BridgeError>> + Send + 'a>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);

            let as_of = MarketDate::from_date(OffsetDateTime::now_utc().date());
            let mut rows = Vec::new();
            for security in &query.securities {
                for field in &query.fields {
                    rows.push(QueryRow {
                        security: security.clone(),
                        field: field.clone(),
                        date: as_of,
                        value: FieldValue::Number(round4(base_price(
                            security.as_str(),
                            field.as_str(),
                        ))),
                    });
                }
            }
            Ok(QueryResult::new(DataOrigin::Mock, rows))
        })
    }

    fn intraday<'a>(
        &'a self,
        query: &'a IntradayQuery,
    ) -> Pin<Box<dyn Future<Output = Result<BarSeries, BridgeError>> + Send + 'a>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);

            let mut bars = Vec::new();
            let mut time = Some(query.start);
            while let Some(current) = time {
                if current > query.end {
                    break;
                }
                if !is_weekend(current.date()) {
                    bars.push(self.bar_for(query.security.as_str(), current));
                }
                time = current.saturating_add_minutes(query.interval_minutes);
            }
            Ok(BarSeries::new(DataOrigin::Mock, bars))
        })
    }
}

fn is_weekend(date: MarketDate) -> bool {
    matches!(
        date.into_inner().weekday(),
        Weekday::Saturday | Weekday::Sunday
    )
}

fn seed64(parts: &[&str]) -> u64 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Map a seed into [0, 1).
fn unit_interval(parts: &[&str]) -> f64 {
    (seed64(parts) % 1_000_000) as f64 / 1_000_000.0
}

/// Stable pseudo-price in [10, 500) for a (security, field) pair.
fn base_price(security: &str, field: &str) -> f64 {
    10.0 + (seed64(&[security, field]) % 49_000) as f64 / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
