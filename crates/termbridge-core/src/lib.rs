//! # termbridge-core
//!
//! Core contracts for the terminal data bridge: the query model, the error
//! taxonomy, and the building blocks shared by the server and client halves
//! of the request pipeline.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`query`] | Queries, validated identifiers, cache fingerprints |
//! | [`result`] | Result rows tagged with their data origin |
//! | [`error`] | Bridge error taxonomy with stable wire codes |
//! | [`cache`] | TTL response cache keyed by fingerprint |
//! | [`retry`] | Backoff computation for the client retry loop |
//! | [`auth`] | Fail-closed API key validation |
//! | [`rate_limit`] | Per-caller request admission |
//! | [`terminal`] | Upstream adapters (live gateway and deterministic mock) |
//! | [`wire`] | HTTP wire shapes shared by server and client |
//!
//! ## Pipeline
//!
//! ```text
//! client call ──▶ local cache ──▶ HTTP ──▶ auth ──▶ rate limit ──▶ server
//!                                                                  cache
//!                                                                    │
//!                                                              terminal fetch
//! ```

pub mod auth;
pub mod cache;
pub mod error;
pub mod query;
pub mod rate_limit;
pub mod result;
pub mod retry;
pub mod terminal;
pub mod wire;

pub use auth::{ApiKeySet, CallerIdentity};
pub use cache::{CacheMode, ResponseCache};
pub use error::{BridgeError, BridgeErrorKind, UpstreamReason, ValidationError};
pub use query::{
    FieldCode, HistoricalQuery, IntradayQuery, MarketDate, MarketDateTime, QueryFingerprint,
    QueryLimits, ReferenceQuery, Security,
};
pub use rate_limit::CallerRateLimiter;
pub use result::{Bar, BarSeries, DataOrigin, FieldValue, QueryResult, QueryRow};
pub use retry::{Backoff, RetryConfig};
pub use terminal::{
    connect, probe_gateway, GatewayTerminal, MockTerminal, ServiceMode, Terminal, TerminalConfig,
};
pub use wire::{
    BarsResponse, DataResponse, ErrorBody, HealthResponse, ServiceBanner, WireError,
    API_KEY_HEADER,
};
