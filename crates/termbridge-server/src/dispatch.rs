//! The server-side request pipeline.
//!
//! Checks run cheapest first and the order is fixed: authenticate, then
//! validate shape, then admit against the caller's rate window, then consult
//! the cache, and only then touch the upstream terminal. Auth failures
//! therefore never consume quota, and malformed or rejected requests never
//! reach the terminal. Upstream failures are returned as-is and never
//! cached.

use termbridge_core::{
    BarsResponse, BridgeError, DataResponse, HistoricalQuery, IntradayQuery, QueryFingerprint,
    QueryResult, ReferenceQuery, Terminal,
};

use crate::state::AppState;

/// A dispatchable query, unifying both endpoints over one pipeline.
#[derive(Debug, Clone)]
pub enum BridgeQuery {
    Historical(HistoricalQuery),
    Reference(ReferenceQuery),
}

impl BridgeQuery {
    fn validate(&self, state: &AppState) -> Result<(), BridgeError> {
        match self {
            Self::Historical(query) => query.validate(&state.limits)?,
            Self::Reference(query) => query.validate(&state.limits)?,
        }
        Ok(())
    }

    fn fingerprint(&self) -> QueryFingerprint {
        match self {
            Self::Historical(query) => query.fingerprint(),
            Self::Reference(query) => query.fingerprint(),
        }
    }

    async fn fetch(&self, terminal: &dyn Terminal) -> Result<QueryResult, BridgeError> {
        match self {
            Self::Historical(query) => terminal.historical(query).await,
            Self::Reference(query) => terminal.reference(query).await,
        }
    }
}

/// Run one query through the full pipeline.
pub async fn run(
    state: &AppState,
    credential: Option<&str>,
    query: BridgeQuery,
) -> Result<DataResponse, BridgeError> {
    let identity = state.auth.authenticate(credential)?;
    query.validate(state)?;
    state
        .limiter
        .admit(&identity)
        .map_err(BridgeError::rate_limited)?;

    let fingerprint = query.fingerprint();
    if let Some(result) = state.cache.get(&fingerprint).await {
        tracing::debug!(caller = %identity, fingerprint = %fingerprint, "cache hit");
        return Ok(DataResponse {
            source: result.origin,
            cached: true,
            rows: result.rows,
        });
    }
    tracing::debug!(caller = %identity, fingerprint = %fingerprint, "cache miss");

    match query.fetch(state.terminal.as_ref()).await {
        Ok(result) => {
            state.cache.put(fingerprint, result.clone()).await;
            Ok(DataResponse {
                source: result.origin,
                cached: false,
                rows: result.rows,
            })
        }
        Err(error) => {
            tracing::warn!(
                caller = %identity,
                code = error.code(),
                "upstream fetch failed: {}",
                error.message()
            );
            Err(error)
        }
    }
}

/// Run an intraday query: the same auth/validate/admit gate, but no cache
/// on either side of the fetch. Bar data churns too fast for the response
/// cache's TTL to be meaningful.
pub async fn run_intraday(
    state: &AppState,
    credential: Option<&str>,
    query: IntradayQuery,
) -> Result<BarsResponse, BridgeError> {
    let identity = state.auth.authenticate(credential)?;
    query.validate(&state.limits)?;
    state
        .limiter
        .admit(&identity)
        .map_err(BridgeError::rate_limited)?;

    match state.terminal.intraday(&query).await {
        Ok(series) => Ok(BarsResponse {
            source: series.origin,
            bars: series.bars,
        }),
        Err(error) => {
            tracing::warn!(
                caller = %identity,
                code = error.code(),
                "upstream intraday fetch failed: {}",
                error.message()
            );
            Err(error)
        }
    }
}
