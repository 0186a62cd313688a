use termbridge_core::BridgeErrorKind;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] termbridge_core::ValidationError),

    #[error("invalid usage: {0}")]
    Usage(String),

    #[error(transparent)]
    Client(#[from] termbridge_client::ClientError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Usage(_) => 2,
            Self::Client(error) => match error.bridge_error().map(|e| e.kind()) {
                Some(BridgeErrorKind::Auth) => 3,
                Some(BridgeErrorKind::RateLimited) => 5,
                Some(BridgeErrorKind::MalformedQuery) => 2,
                Some(BridgeErrorKind::Upstream(_)) | None => 6,
            },
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termbridge_client::ClientError;
    use termbridge_core::BridgeError;

    #[test]
    fn auth_failures_map_to_their_own_exit_code() {
        let error = CliError::Client(ClientError::Request {
            error: BridgeError::auth("bad key"),
            attempts: 1,
        });
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn validation_failures_exit_with_usage_code() {
        let error = CliError::Usage(String::from("empty securities"));
        assert_eq!(error.exit_code(), 2);
    }
}
