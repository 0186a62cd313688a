//! Retry behavior against a scripted upstream that fails on cue.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use termbridge_client::{BridgeClient, ClientConfig};
use termbridge_core::{
    BridgeErrorKind, DataOrigin, DataResponse, ErrorBody, FieldCode, HistoricalQuery, MarketDate,
    RetryConfig, Security, WireError,
};

/// A server that answers the first `failures` requests with a scripted
/// error, then succeeds.
struct Script {
    failures: u32,
    status: StatusCode,
    code: &'static str,
    retry_after_secs: Option<u64>,
    hits: AtomicU32,
}

impl Script {
    fn new(failures: u32, status: StatusCode, code: &'static str) -> Self {
        Self {
            failures,
            status,
            code,
            retry_after_secs: None,
            hits: AtomicU32::new(0),
        }
    }

    fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }

    fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn scripted_historical(State(script): State<Arc<Script>>) -> axum::response::Response {
    let attempt = script.hits.fetch_add(1, Ordering::SeqCst);
    if attempt < script.failures {
        let body = Json(ErrorBody {
            error: WireError {
                code: script.code.to_owned(),
                message: String::from("scripted failure"),
            },
        });
        let mut response = (script.status, body).into_response();
        if let Some(secs) = script.retry_after_secs {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                secs.to_string().parse().expect("valid header value"),
            );
        }
        return response;
    }

    Json(DataResponse {
        source: DataOrigin::Live,
        cached: false,
        rows: Vec::new(),
    })
    .into_response()
}

async fn spawn_scripted(script: Script) -> (String, Arc<Script>) {
    let script = Arc::new(script);
    let app = Router::new()
        .route("/v1/historical", post(scripted_historical))
        .with_state(script.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind scripted listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("scripted server");
    });

    (format!("http://{addr}"), script)
}

fn client_for(base_url: &str, retry: RetryConfig) -> BridgeClient {
    BridgeClient::new(
        ClientConfig::new(base_url, "test-key")
            .with_timeout(Duration::from_secs(5))
            .with_retry(retry),
    )
    .expect("client construction")
}

fn any_query() -> HistoricalQuery {
    HistoricalQuery::new(
        vec![Security::parse("AAPL US Equity").unwrap()],
        vec![FieldCode::parse("PX_LAST").unwrap()],
        MarketDate::parse("2024-01-02").unwrap(),
        MarketDate::parse("2024-01-02").unwrap(),
    )
    .unwrap()
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let (base_url, script) = spawn_scripted(Script::new(
        2,
        StatusCode::SERVICE_UNAVAILABLE,
        "upstream.service_down",
    ))
    .await;
    let client = client_for(
        &base_url,
        RetryConfig::fixed(Duration::from_millis(10), 3),
    );

    let result = client.historical(&any_query()).await.unwrap();
    assert_eq!(result.origin, DataOrigin::Live);
    assert_eq!(script.hits(), 3);
}

#[tokio::test]
async fn retry_bound_is_respected() {
    let (base_url, script) = spawn_scripted(Script::new(
        u32::MAX,
        StatusCode::SERVICE_UNAVAILABLE,
        "upstream.service_down",
    ))
    .await;
    let client = client_for(&base_url, RetryConfig::fixed(Duration::from_millis(5), 1));

    let error = client.historical(&any_query()).await.unwrap_err();
    assert_eq!(error.attempts(), Some(2));
    assert_eq!(script.hits(), 2);
}

#[tokio::test]
async fn non_transient_errors_fail_immediately() {
    let (base_url, script) = spawn_scripted(Script::new(
        u32::MAX,
        StatusCode::BAD_REQUEST,
        "query.malformed",
    ))
    .await;
    let client = client_for(&base_url, RetryConfig::fixed(Duration::from_millis(5), 3));

    let error = client.historical(&any_query()).await.unwrap_err();
    assert_eq!(error.attempts(), Some(1));
    assert_eq!(
        error.bridge_error().unwrap().kind(),
        BridgeErrorKind::MalformedQuery
    );
    assert_eq!(script.hits(), 1);
}

#[tokio::test]
async fn server_retry_after_stretches_the_backoff() {
    let (base_url, script) = spawn_scripted(
        Script::new(1, StatusCode::TOO_MANY_REQUESTS, "rate.limited").with_retry_after(1),
    )
    .await;
    let client = client_for(&base_url, RetryConfig::fixed(Duration::from_millis(1), 2));

    let started = Instant::now();
    let result = client.historical(&any_query()).await.unwrap();
    assert_eq!(result.origin, DataOrigin::Live);
    assert_eq!(script.hits(), 2);
    // The configured 1ms delay is overridden by the server's Retry-After.
    assert!(started.elapsed() >= Duration::from_millis(900));
}
