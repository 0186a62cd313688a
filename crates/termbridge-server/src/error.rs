//! HTTP mapping for the bridge error taxonomy.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use termbridge_core::{BridgeError, BridgeErrorKind, ErrorBody, WireError};

/// Response wrapper carrying a [`BridgeError`] out of a handler.
///
/// Each taxonomy kind keeps its own status: the server never flattens a
/// typed failure into a bare 500.
#[derive(Debug)]
pub struct ApiError(pub BridgeError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.kind() {
            BridgeErrorKind::Auth => StatusCode::UNAUTHORIZED,
            BridgeErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            BridgeErrorKind::MalformedQuery => StatusCode::BAD_REQUEST,
            BridgeErrorKind::Upstream(reason) if reason.is_transient() => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            BridgeErrorKind::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<BridgeError> for ApiError {
    fn from(error: BridgeError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorBody {
            error: WireError {
                code: self.0.code().to_owned(),
                message: self.0.message().to_owned(),
            },
        });

        let mut response = (status, body).into_response();
        if let Some(retry_after) = self.0.retry_after() {
            let seconds = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use termbridge_core::UpstreamReason;

    #[test]
    fn status_mapping_preserves_the_taxonomy() {
        assert_eq!(
            ApiError(BridgeError::auth("no key")).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError(BridgeError::rate_limited(Duration::from_secs(3))).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError(BridgeError::malformed("bad shape")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(BridgeError::upstream(UpstreamReason::Timeout, "slow")).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError(BridgeError::upstream(UpstreamReason::UnknownSecurity, "bad")).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn rate_limit_response_carries_retry_after_header() {
        let response =
            ApiError(BridgeError::rate_limited(Duration::from_secs(7))).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            HeaderValue::from_static("7")
        );
    }
}
