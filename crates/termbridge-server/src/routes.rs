//! HTTP surface of the bridge.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use termbridge_core::{
    BridgeError, HealthResponse, HistoricalQuery, IntradayQuery, ReferenceQuery, ServiceBanner,
    API_KEY_HEADER,
};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::dispatch::{self, BridgeQuery};
use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/v1/historical", post(historical))
        .route("/v1/reference", post(reference))
        .route("/v1/intraday", post(intraday))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root(State(state): State<AppState>) -> Json<ServiceBanner> {
    Json(ServiceBanner {
        service: String::from("termbridge"),
        version: String::from(env!("CARGO_PKG_VERSION")),
        mode: state.terminal.mode(),
        endpoints: vec![
            String::from("/health"),
            String::from("/v1/historical"),
            String::from("/v1/reference"),
            String::from("/v1/intraday"),
        ],
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: String::from("healthy"),
        mode: state.terminal.mode(),
        cache_entries: state.cache.len().await,
        timestamp: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
    })
}

async fn historical(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<HistoricalQuery>, JsonRejection>,
) -> Result<Json<termbridge_core::DataResponse>, ApiError> {
    let Json(query) = payload.map_err(reject_body)?;
    let request_id = Uuid::new_v4();
    tracing::info!(
        %request_id,
        securities = query.securities.len(),
        fields = query.fields.len(),
        start = %query.start_date,
        end = %query.end_date,
        "historical data request"
    );
    let response =
        dispatch::run(&state, api_key(&headers), BridgeQuery::Historical(query)).await?;
    Ok(Json(response))
}

async fn reference(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ReferenceQuery>, JsonRejection>,
) -> Result<Json<termbridge_core::DataResponse>, ApiError> {
    let Json(query) = payload.map_err(reject_body)?;
    let request_id = Uuid::new_v4();
    tracing::info!(
        %request_id,
        securities = query.securities.len(),
        fields = query.fields.len(),
        "reference data request"
    );
    let response = dispatch::run(&state, api_key(&headers), BridgeQuery::Reference(query)).await?;
    Ok(Json(response))
}

async fn intraday(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<IntradayQuery>, JsonRejection>,
) -> Result<Json<termbridge_core::BarsResponse>, ApiError> {
    let Json(query) = payload.map_err(reject_body)?;
    let request_id = Uuid::new_v4();
    tracing::info!(
        %request_id,
        security = %query.security,
        start = %query.start,
        end = %query.end,
        interval = query.interval_minutes,
        "intraday data request"
    );
    let response = dispatch::run_intraday(&state, api_key(&headers), query).await?;
    Ok(Json(response))
}

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|value| value.to_str().ok())
}

fn reject_body(rejection: JsonRejection) -> ApiError {
    ApiError(BridgeError::malformed(rejection.body_text()))
}
