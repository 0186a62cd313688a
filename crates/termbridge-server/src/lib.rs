//! # termbridge-server
//!
//! HTTP bridge server exposing the terminal's data API to the network.
//! Each request flows through authentication, per-caller rate limiting, the
//! shared response cache, and finally the upstream terminal adapter; see
//! [`dispatch`] for the pipeline and [`routes`] for the HTTP surface.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{Config, ConfigError};
pub use state::AppState;
