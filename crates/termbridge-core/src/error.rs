use std::fmt::{Display, Formatter};
use std::time::Duration;

use thiserror::Error;

/// Input-shape violations detected before any network work.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("query must include at least one security")]
    EmptySecurities,
    #[error("query must include at least one field")]
    EmptyFields,
    #[error("security identifier cannot be empty")]
    EmptySecurity,
    #[error("field code cannot be empty")]
    EmptyField,
    #[error("date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("datetime must be YYYY-MM-DDTHH:MM:SS: '{value}'")]
    InvalidDateTime { value: String },
    #[error("start date {start} is after end date {end}")]
    StartAfterEnd { start: String, end: String },
    #[error("bar interval must be between 1 and 1440 minutes, got {minutes}")]
    InvalidInterval { minutes: u32 },
    #[error("query has {len} securities, maximum is {max}")]
    TooManySecurities { len: usize, max: usize },
    #[error("query has {len} fields, maximum is {max}")]
    TooManyFields { len: usize, max: usize },
    #[error("date range spans {days} days, maximum is {max}")]
    DateRangeTooLarge { days: i64, max: i64 },
}

/// Reason code attached to upstream failures.
///
/// Timeouts and dropped connections are worth retrying; the rest are
/// domain-level rejections that will fail the same way every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamReason {
    Timeout,
    ConnectionLost,
    ServiceDown,
    UnknownSecurity,
    UnknownField,
    NotLoggedIn,
    LicenseRestricted,
    Rejected,
}

impl UpstreamReason {
    pub const fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ConnectionLost | Self::ServiceDown
        )
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Timeout => "upstream.timeout",
            Self::ConnectionLost => "upstream.connection_lost",
            Self::ServiceDown => "upstream.service_down",
            Self::UnknownSecurity => "upstream.unknown_security",
            Self::UnknownField => "upstream.unknown_field",
            Self::NotLoggedIn => "upstream.not_logged_in",
            Self::LicenseRestricted => "upstream.license_restricted",
            Self::Rejected => "upstream.rejected",
        }
    }
}

/// Error classification for the bridge pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeErrorKind {
    Auth,
    RateLimited,
    Upstream(UpstreamReason),
    MalformedQuery,
}

/// Structured bridge error carried through both halves of the pipeline.
///
/// One error kind is never collapsed into another: the wire code round-trips
/// so the client can decide retry eligibility from the same taxonomy the
/// server produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeError {
    kind: BridgeErrorKind,
    message: String,
    retry_after: Option<Duration>,
}

impl BridgeError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self {
            kind: BridgeErrorKind::Auth,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn rate_limited(retry_after: Duration) -> Self {
        Self {
            kind: BridgeErrorKind::RateLimited,
            message: format!(
                "request quota exhausted, retry in {}s",
                retry_after.as_secs().max(1)
            ),
            retry_after: Some(retry_after),
        }
    }

    pub fn upstream(reason: UpstreamReason, message: impl Into<String>) -> Self {
        Self {
            kind: BridgeErrorKind::Upstream(reason),
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: BridgeErrorKind::MalformedQuery,
            message: message.into(),
            retry_after: None,
        }
    }

    pub const fn kind(&self) -> BridgeErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Whether a retry with the same request can plausibly succeed.
    pub const fn is_transient(&self) -> bool {
        match self.kind {
            BridgeErrorKind::RateLimited => true,
            BridgeErrorKind::Upstream(reason) => reason.is_transient(),
            BridgeErrorKind::Auth | BridgeErrorKind::MalformedQuery => false,
        }
    }

    /// Stable wire code for this error.
    pub const fn code(&self) -> &'static str {
        match self.kind {
            BridgeErrorKind::Auth => "auth.invalid_key",
            BridgeErrorKind::RateLimited => "rate.limited",
            BridgeErrorKind::Upstream(reason) => reason.code(),
            BridgeErrorKind::MalformedQuery => "query.malformed",
        }
    }

    /// Reconstruct the taxonomy from a wire error object.
    ///
    /// Unrecognized codes map to a non-transient service failure so the
    /// client never retries blindly on an unknown error class.
    pub fn from_wire(code: &str, message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let kind = match code {
            "auth.invalid_key" => BridgeErrorKind::Auth,
            "rate.limited" => BridgeErrorKind::RateLimited,
            "query.malformed" => BridgeErrorKind::MalformedQuery,
            "upstream.timeout" => BridgeErrorKind::Upstream(UpstreamReason::Timeout),
            "upstream.connection_lost" => BridgeErrorKind::Upstream(UpstreamReason::ConnectionLost),
            "upstream.service_down" => BridgeErrorKind::Upstream(UpstreamReason::ServiceDown),
            "upstream.unknown_security" => {
                BridgeErrorKind::Upstream(UpstreamReason::UnknownSecurity)
            }
            "upstream.unknown_field" => BridgeErrorKind::Upstream(UpstreamReason::UnknownField),
            "upstream.not_logged_in" => BridgeErrorKind::Upstream(UpstreamReason::NotLoggedIn),
            "upstream.license_restricted" => {
                BridgeErrorKind::Upstream(UpstreamReason::LicenseRestricted)
            }
            _ => BridgeErrorKind::Upstream(UpstreamReason::Rejected),
        };

        let mut error = Self {
            kind,
            message: message.into(),
            retry_after,
        };
        if matches!(error.kind, BridgeErrorKind::RateLimited) && error.retry_after.is_none() {
            error.retry_after = Some(Duration::from_secs(1));
        }
        error
    }
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for BridgeError {}

impl From<ValidationError> for BridgeError {
    fn from(error: ValidationError) -> Self {
        Self::malformed(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification_follows_reason_codes() {
        assert!(BridgeError::rate_limited(Duration::from_secs(5)).is_transient());
        assert!(BridgeError::upstream(UpstreamReason::Timeout, "slow").is_transient());
        assert!(BridgeError::upstream(UpstreamReason::ConnectionLost, "gone").is_transient());
        assert!(!BridgeError::upstream(UpstreamReason::UnknownSecurity, "bad ticker").is_transient());
        assert!(!BridgeError::upstream(UpstreamReason::LicenseRestricted, "no license").is_transient());
        assert!(!BridgeError::auth("missing key").is_transient());
        assert!(!BridgeError::malformed("empty fields").is_transient());
    }

    #[test]
    fn wire_codes_round_trip() {
        let original = BridgeError::upstream(UpstreamReason::UnknownField, "PX_BOGUS");
        let decoded = BridgeError::from_wire(original.code(), original.message(), None);
        assert_eq!(decoded.kind(), original.kind());
        assert_eq!(decoded.code(), "upstream.unknown_field");
    }

    #[test]
    fn unknown_wire_code_is_not_retried() {
        let decoded = BridgeError::from_wire("something.new", "??", None);
        assert!(!decoded.is_transient());
    }

    #[test]
    fn validation_error_converts_to_malformed() {
        let error: BridgeError = ValidationError::EmptyFields.into();
        assert_eq!(error.kind(), BridgeErrorKind::MalformedQuery);
        assert_eq!(error.code(), "query.malformed");
    }
}
