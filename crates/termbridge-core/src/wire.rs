//! Wire shapes shared by the server and client halves of the bridge.
//!
//! The credential travels in the [`API_KEY_HEADER`] header; query payloads
//! are JSON bodies. Error responses carry `{ "error": { code, message } }`
//! with the taxonomy codes from [`crate::error`], plus a `Retry-After`
//! header on rate-limit rejections.

use serde::{Deserialize, Serialize};

use crate::result::{Bar, DataOrigin, QueryRow};
use crate::terminal::ServiceMode;

/// Header carrying the caller's credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Successful data response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    pub source: DataOrigin,
    pub cached: bool,
    pub rows: Vec<QueryRow>,
}

/// Successful intraday response. Intraday results bypass both caches, so
/// there is no `cached` flag to report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarsResponse {
    pub source: DataOrigin,
    pub bars: Vec<Bar>,
}

/// Error payload body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: WireError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    pub code: String,
    pub message: String,
}

/// `GET /health` response: liveness plus the live/mock degradation signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub mode: ServiceMode,
    pub cache_entries: usize,
    pub timestamp: String,
}

/// `GET /` service banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBanner {
    pub service: String,
    pub version: String,
    pub mode: ServiceMode,
    pub endpoints: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FieldCode, MarketDate, Security};
    use crate::result::FieldValue;

    #[test]
    fn data_response_wire_shape() {
        let response = DataResponse {
            source: DataOrigin::Mock,
            cached: true,
            rows: vec![QueryRow {
                security: Security::parse("AAPL US Equity").unwrap(),
                field: FieldCode::parse("PX_LAST").unwrap(),
                date: MarketDate::parse("2024-01-02").unwrap(),
                value: FieldValue::Number(185.64),
            }],
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["source"], "mock");
        assert_eq!(json["cached"], true);
        assert_eq!(json["rows"][0]["security"], "AAPL US Equity");
        assert_eq!(json["rows"][0]["date"], "2024-01-02");
    }

    #[test]
    fn error_body_round_trips() {
        let body = ErrorBody {
            error: WireError {
                code: String::from("rate.limited"),
                message: String::from("request quota exhausted, retry in 3s"),
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        let back: ErrorBody = serde_json::from_str(&json).unwrap();
        assert_eq!(back, body);
    }
}
