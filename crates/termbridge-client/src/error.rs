use termbridge_core::BridgeError;
use thiserror::Error;

/// Failures surfaced by the client request engine.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The bridge (or the transport to it) rejected the request. Carries the
    /// last error observed and how many attempts were made before giving up.
    #[error("request failed after {attempts} attempt(s): {error}")]
    Request { error: BridgeError, attempts: u32 },

    /// A batch worker terminated abnormally.
    #[error("batch worker failed: {0}")]
    Worker(String),

    /// The HTTP client itself could not be constructed; the configured
    /// timeout would not be enforceable.
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// The underlying bridge error, when this failure came from the request
    /// pipeline.
    pub fn bridge_error(&self) -> Option<&BridgeError> {
        match self {
            Self::Request { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Attempts made before the failure was surfaced.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Request { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}
