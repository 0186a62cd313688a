//! Query model: validated identifiers, date range, and cache fingerprints.

use std::fmt::{Display, Formatter, Write as _};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

use crate::error::ValidationError;

/// Security identifier as understood by the terminal, e.g. `AAPL US Equity`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Security(String);

impl Security {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySecurity);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Security {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Security {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Security {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Terminal field mnemonic, e.g. `PX_LAST`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldCode(String);

impl FieldCode {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyField);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FieldCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for FieldCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FieldCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Calendar date in `YYYY-MM-DD` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarketDate(Date);

impl MarketDate {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let format = format_description!("[year]-[month]-[day]");
        Date::parse(input, &format)
            .map(Self)
            .map_err(|_| ValidationError::InvalidDate {
                value: input.to_owned(),
            })
    }

    pub fn from_date(date: Date) -> Self {
        Self(date)
    }

    pub fn into_inner(self) -> Date {
        self.0
    }

    pub fn next_day(self) -> Option<Self> {
        self.0.next_day().map(Self)
    }
}

impl Display for MarketDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let format = format_description!("[year]-[month]-[day]");
        match self.0.format(&format) {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

impl Serialize for MarketDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MarketDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Timestamp at bar resolution, `YYYY-MM-DDTHH:MM:SS`, in the terminal's
/// local market time (no zone offset on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarketDateTime(PrimitiveDateTime);

impl MarketDateTime {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
        PrimitiveDateTime::parse(input, &format)
            .map(Self)
            .map_err(|_| ValidationError::InvalidDateTime {
                value: input.to_owned(),
            })
    }

    pub fn from_datetime(datetime: PrimitiveDateTime) -> Self {
        Self(datetime)
    }

    pub fn into_inner(self) -> PrimitiveDateTime {
        self.0
    }

    pub fn date(self) -> MarketDate {
        MarketDate(self.0.date())
    }

    pub fn saturating_add_minutes(self, minutes: u32) -> Option<Self> {
        self.0
            .checked_add(time::Duration::minutes(i64::from(minutes)))
            .map(Self)
    }
}

impl Display for MarketDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
        match self.0.format(&format) {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

impl Serialize for MarketDateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MarketDateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Per-request limits enforced by the server before any upstream work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub max_securities: usize,
    pub max_fields: usize,
    pub max_range_days: i64,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_securities: 100,
            max_fields: 50,
            max_range_days: 3650,
        }
    }
}

/// Date-ranged data query, both endpoints inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalQuery {
    pub securities: Vec<Security>,
    pub fields: Vec<FieldCode>,
    pub start_date: MarketDate,
    pub end_date: MarketDate,
}

impl HistoricalQuery {
    pub fn new(
        securities: Vec<Security>,
        fields: Vec<FieldCode>,
        start_date: MarketDate,
        end_date: MarketDate,
    ) -> Result<Self, ValidationError> {
        if securities.is_empty() {
            return Err(ValidationError::EmptySecurities);
        }
        if fields.is_empty() {
            return Err(ValidationError::EmptyFields);
        }
        if start_date > end_date {
            return Err(ValidationError::StartAfterEnd {
                start: start_date.to_string(),
                end: end_date.to_string(),
            });
        }
        Ok(Self {
            securities,
            fields,
            start_date,
            end_date,
        })
    }

    /// Re-check structural invariants plus the configured size limits.
    ///
    /// Deserialized queries bypass `new`, so the server runs this before
    /// dispatching.
    pub fn validate(&self, limits: &QueryLimits) -> Result<(), ValidationError> {
        if self.securities.is_empty() {
            return Err(ValidationError::EmptySecurities);
        }
        if self.fields.is_empty() {
            return Err(ValidationError::EmptyFields);
        }
        if self.start_date > self.end_date {
            return Err(ValidationError::StartAfterEnd {
                start: self.start_date.to_string(),
                end: self.end_date.to_string(),
            });
        }
        if self.securities.len() > limits.max_securities {
            return Err(ValidationError::TooManySecurities {
                len: self.securities.len(),
                max: limits.max_securities,
            });
        }
        if self.fields.len() > limits.max_fields {
            return Err(ValidationError::TooManyFields {
                len: self.fields.len(),
                max: limits.max_fields,
            });
        }
        let days = (self.end_date.into_inner() - self.start_date.into_inner()).whole_days();
        if days > limits.max_range_days {
            return Err(ValidationError::DateRangeTooLarge {
                days,
                max: limits.max_range_days,
            });
        }
        Ok(())
    }

    pub fn fingerprint(&self) -> QueryFingerprint {
        QueryFingerprint::compute(
            "hist",
            &self.securities,
            &self.fields,
            Some((self.start_date, self.end_date)),
        )
    }
}

/// Point-in-time query for current/static field values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceQuery {
    pub securities: Vec<Security>,
    pub fields: Vec<FieldCode>,
}

impl ReferenceQuery {
    pub fn new(securities: Vec<Security>, fields: Vec<FieldCode>) -> Result<Self, ValidationError> {
        if securities.is_empty() {
            return Err(ValidationError::EmptySecurities);
        }
        if fields.is_empty() {
            return Err(ValidationError::EmptyFields);
        }
        Ok(Self { securities, fields })
    }

    pub fn validate(&self, limits: &QueryLimits) -> Result<(), ValidationError> {
        if self.securities.is_empty() {
            return Err(ValidationError::EmptySecurities);
        }
        if self.fields.is_empty() {
            return Err(ValidationError::EmptyFields);
        }
        if self.securities.len() > limits.max_securities {
            return Err(ValidationError::TooManySecurities {
                len: self.securities.len(),
                max: limits.max_securities,
            });
        }
        if self.fields.len() > limits.max_fields {
            return Err(ValidationError::TooManyFields {
                len: self.fields.len(),
                max: limits.max_fields,
            });
        }
        Ok(())
    }

    pub fn fingerprint(&self) -> QueryFingerprint {
        QueryFingerprint::compute("ref", &self.securities, &self.fields, None)
    }
}

/// Bar-resolution query for a single security over a datetime range.
///
/// Intraday results are never cached (the data is too fine-grained for the
/// response cache's TTL to be meaningful), so this query carries no
/// fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntradayQuery {
    pub security: Security,
    pub start: MarketDateTime,
    pub end: MarketDateTime,
    /// Bar width in minutes, 1..=1440.
    pub interval_minutes: u32,
}

impl IntradayQuery {
    pub fn new(
        security: Security,
        start: MarketDateTime,
        end: MarketDateTime,
        interval_minutes: u32,
    ) -> Result<Self, ValidationError> {
        let query = Self {
            security,
            start,
            end,
            interval_minutes,
        };
        query.check_shape()?;
        Ok(query)
    }

    fn check_shape(&self) -> Result<(), ValidationError> {
        if self.start > self.end {
            return Err(ValidationError::StartAfterEnd {
                start: self.start.to_string(),
                end: self.end.to_string(),
            });
        }
        if self.interval_minutes == 0 || self.interval_minutes > 1440 {
            return Err(ValidationError::InvalidInterval {
                minutes: self.interval_minutes,
            });
        }
        Ok(())
    }

    /// Re-check structural invariants plus the configured range limit.
    pub fn validate(&self, limits: &QueryLimits) -> Result<(), ValidationError> {
        self.check_shape()?;
        let days = (self.end.into_inner() - self.start.into_inner()).whole_days();
        if days > limits.max_range_days {
            return Err(ValidationError::DateRangeTooLarge {
                days,
                max: limits.max_range_days,
            });
        }
        Ok(())
    }
}

/// Canonical cache key for a query's semantic content.
///
/// Security and field order is not significant: lists are sorted and
/// deduplicated before hashing, so reordered but equivalent queries share a
/// cache entry. The hash is a pure function of content and therefore stable
/// across process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryFingerprint(String);

impl QueryFingerprint {
    fn compute(
        domain: &str,
        securities: &[Security],
        fields: &[FieldCode],
        range: Option<(MarketDate, MarketDate)>,
    ) -> Self {
        let mut sorted_securities: Vec<&str> =
            securities.iter().map(Security::as_str).collect();
        sorted_securities.sort_unstable();
        sorted_securities.dedup();

        let mut sorted_fields: Vec<&str> = fields.iter().map(FieldCode::as_str).collect();
        sorted_fields.sort_unstable();
        sorted_fields.dedup();

        let mut hasher = Sha256::new();
        hasher.update(domain.as_bytes());
        hasher.update([0x1e]);
        for security in &sorted_securities {
            hasher.update(security.as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update([0x1e]);
        for field in &sorted_fields {
            hasher.update(field.as_bytes());
            hasher.update([0x1f]);
        }
        if let Some((start, end)) = range {
            hasher.update([0x1e]);
            hasher.update(start.to_string().as_bytes());
            hasher.update([0x1f]);
            hasher.update(end.to_string().as_bytes());
        }

        let digest = hasher.finalize();
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for QueryFingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
