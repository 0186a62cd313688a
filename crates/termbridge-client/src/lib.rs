//! Client half of the terminal data bridge.
//!
//! [`BridgeClient`] talks to a running bridge server over HTTP: it caches
//! responses locally, retries transient failures with backoff, and fans out
//! batches with bounded concurrency. [`export`] writes fetched results to
//! CSV or JSON files.

pub mod client;
pub mod config;
pub mod error;
pub mod export;

pub use client::BridgeClient;
pub use config::ClientConfig;
pub use error::ClientError;
