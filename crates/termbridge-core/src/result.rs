//! Result rows returned by the bridge, tagged with their data origin.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::query::{FieldCode, MarketDate, MarketDateTime, Security};

/// Whether a result came from the real terminal or the synthetic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Live,
    Mock,
}

impl DataOrigin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Mock => "mock",
        }
    }
}

impl Display for DataOrigin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single field value. The terminal reports numbers for most fields but
/// strings for names/sectors, and null when a field is absent for a security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Null,
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(_) | Self::Null => None,
        }
    }
}

/// One (security, field, date, value) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRow {
    pub security: Security,
    pub field: FieldCode,
    pub date: MarketDate,
    pub value: FieldValue,
}

/// Ordered result set for a single query.
///
/// Rows are ordered by security (input order), then date, then field
/// (input order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub origin: DataOrigin,
    pub rows: Vec<QueryRow>,
}

impl QueryResult {
    pub fn new(origin: DataOrigin, rows: Vec<QueryRow>) -> Self {
        Self { origin, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One aggregated intraday bar: OHLCV plus the tick count behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: MarketDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// Ticks aggregated into this bar.
    pub events: u32,
}

/// Intraday bars for one security, ordered by bar start time ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    pub origin: DataOrigin,
    pub bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(origin: DataOrigin, bars: Vec<Bar>) -> Self {
        Self { origin, bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_serializes_untagged() {
        assert_eq!(serde_json::to_string(&FieldValue::Number(185.5)).unwrap(), "185.5");
        assert_eq!(
            serde_json::to_string(&FieldValue::Text("Apple Inc".into())).unwrap(),
            "\"Apple Inc\""
        );
        assert_eq!(serde_json::to_string(&FieldValue::Null).unwrap(), "null");
    }

    #[test]
    fn field_value_deserializes_from_json_scalars() {
        assert_eq!(
            serde_json::from_str::<FieldValue>("42.0").unwrap(),
            FieldValue::Number(42.0)
        );
        assert_eq!(
            serde_json::from_str::<FieldValue>("null").unwrap(),
            FieldValue::Null
        );
    }

    #[test]
    fn origin_tag_uses_snake_case_wire_names() {
        assert_eq!(serde_json::to_string(&DataOrigin::Mock).unwrap(), "\"mock\"");
        assert_eq!(
            serde_json::from_str::<DataOrigin>("\"live\"").unwrap(),
            DataOrigin::Live
        );
    }

    #[test]
    fn row_round_trips_through_json() {
        let row = QueryRow {
            security: Security::parse("AAPL US Equity").unwrap(),
            field: FieldCode::parse("PX_LAST").unwrap(),
            date: MarketDate::parse("2024-01-02").unwrap(),
            value: FieldValue::Number(185.64),
        };
        let json = serde_json::to_string(&row).unwrap();
        let back: QueryRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn bar_round_trips_through_json() {
        let bar = Bar {
            time: MarketDateTime::parse("2024-01-02T09:30:00").unwrap(),
            open: 185.1,
            high: 185.9,
            low: 184.8,
            close: 185.4,
            volume: 120_000,
            events: 842,
        };
        let json = serde_json::to_value(&bar).unwrap();
        assert_eq!(json["time"], "2024-01-02T09:30:00");
        let back: Bar = serde_json::from_value(json).unwrap();
        assert_eq!(back, bar);
    }
}
