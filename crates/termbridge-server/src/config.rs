//! Environment-driven server configuration.

use std::env;
use std::time::Duration;

use termbridge_core::{QueryLimits, TerminalConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TERMBRIDGE_API_KEYS must be set to a comma-separated list of keys")]
    MissingApiKeys,
    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Server configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub api_keys: Vec<String>,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    pub rate_limit_window: Duration,
    pub rate_limit_max_requests: u32,
    pub limits: QueryLimits,
    pub terminal: TerminalConfig,
}

impl Config {
    /// Read configuration from the environment. The API key list is the only
    /// required variable; everything else has the original deployment's
    /// defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_keys: Vec<String> = env::var("TERMBRIDGE_API_KEYS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_owned)
            .collect();
        if api_keys.is_empty() {
            return Err(ConfigError::MissingApiKeys);
        }

        Ok(Self {
            host: env::var("TERMBRIDGE_HOST").unwrap_or_else(|_| String::from("0.0.0.0")),
            port: parse_env("TERMBRIDGE_PORT", 8080)?,
            api_keys,
            cache_ttl: Duration::from_secs(parse_env("TERMBRIDGE_CACHE_TTL_SECONDS", 300)?),
            cache_max_entries: parse_env("TERMBRIDGE_CACHE_MAX_ENTRIES", 1000)?,
            rate_limit_window: Duration::from_secs(parse_env(
                "TERMBRIDGE_RATE_LIMIT_WINDOW_SECONDS",
                60,
            )?),
            rate_limit_max_requests: parse_env("TERMBRIDGE_RATE_LIMIT_MAX_REQUESTS", 60)?,
            limits: QueryLimits {
                max_securities: parse_env("TERMBRIDGE_MAX_SECURITIES", 100)?,
                max_fields: parse_env("TERMBRIDGE_MAX_FIELDS", 50)?,
                max_range_days: parse_env("TERMBRIDGE_MAX_DATE_RANGE_DAYS", 3650)?,
            },
            terminal: TerminalConfig {
                gateway_host: env::var("TERMINAL_GATEWAY_HOST")
                    .unwrap_or_else(|_| String::from("localhost")),
                gateway_port: parse_env("TERMINAL_GATEWAY_PORT", 8194)?,
                timeout: Duration::from_millis(parse_env("TERMINAL_TIMEOUT_MS", 30_000)?),
                mock_variance: parse_env("TERMBRIDGE_MOCK_VARIANCE", 0.02)?,
            },
        })
    }
}

fn parse_env<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}
