//! Shared per-instance state, injected into request handlers.
//!
//! All mutable state (cache, limiter windows) lives here, owned by the
//! server instance. Tests construct isolated instances; nothing is
//! process-global.

use std::sync::Arc;

use termbridge_core::{
    ApiKeySet, CallerRateLimiter, QueryLimits, ResponseCache, Terminal,
};

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub auth: ApiKeySet,
    pub limiter: CallerRateLimiter,
    pub cache: ResponseCache,
    pub terminal: Arc<dyn Terminal>,
    pub limits: QueryLimits,
}

impl AppState {
    pub fn new(config: &Config, terminal: Arc<dyn Terminal>) -> Self {
        Self {
            auth: ApiKeySet::new(config.api_keys.iter().cloned()),
            limiter: CallerRateLimiter::new(
                config.rate_limit_window,
                config.rate_limit_max_requests,
            ),
            cache: ResponseCache::new(config.cache_ttl, config.cache_max_entries),
            terminal,
            limits: config.limits,
        }
    }
}
