//! Shared fixtures for the integration tests: a real bridge server bound to
//! an ephemeral port, backed by the deterministic mock terminal so tests can
//! count upstream fetches.

use std::sync::Arc;
use std::time::Duration;

use termbridge_core::{MockTerminal, QueryLimits, TerminalConfig};
use termbridge_server::{routes, AppState, Config};

pub const TEST_API_KEY: &str = "integration-test-key";

/// A running bridge instance plus a handle to its terminal spy.
pub struct TestBridge {
    pub base_url: String,
    pub terminal: Arc<MockTerminal>,
}

pub fn test_config() -> Config {
    Config {
        host: String::from("127.0.0.1"),
        port: 0,
        api_keys: vec![String::from(TEST_API_KEY)],
        cache_ttl: Duration::from_secs(300),
        cache_max_entries: 100,
        rate_limit_window: Duration::from_secs(60),
        rate_limit_max_requests: 100,
        limits: QueryLimits::default(),
        terminal: TerminalConfig::default(),
    }
}

/// Start a bridge server on an ephemeral port and return its base URL.
pub async fn spawn_bridge(config: Config) -> TestBridge {
    let terminal = Arc::new(MockTerminal::new(config.terminal.mock_variance));
    let state = AppState::new(&config, terminal.clone());
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), 0))
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });

    TestBridge {
        base_url: format!("http://{addr}"),
        terminal,
    }
}
