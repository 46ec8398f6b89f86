//! Revocation workflow configuration.

use std::time::Duration;

use thiserror::Error;

use crate::RetryPolicy;

pub const ENV_TIMEOUT_MS: &str = "SIGNON_REVOCATION_TIMEOUT_MS";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "SIGNON_REVOCATION_CONNECT_TIMEOUT_MS";
pub const ENV_MAX_IN_FLIGHT: &str = "SIGNON_REVOCATION_MAX_IN_FLIGHT";
pub const ENV_RETRY_ROUNDS: &str = "SIGNON_REVOCATION_RETRY_ROUNDS";
pub const ENV_RETRY_DELAY_MS: &str = "SIGNON_REVOCATION_RETRY_DELAY_MS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}: expected a non-negative integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

/// Revocation workflow configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationConfig {
    /// Upper bound on a single revocation call. When it elapses the outcome
    /// for that application is a `"timeout"` failure.
    pub timeout: Duration,
    /// TCP connect timeout for the HTTP client.
    pub connect_timeout: Duration,
    /// Maximum revocation calls in flight at once (None = one per application).
    pub max_in_flight: Option<usize>,
    /// Rounds run when an operator retries failed revocations.
    pub retry: RetryPolicy,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            max_in_flight: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl RevocationConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = Some(max);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Defaults overridden by `SIGNON_REVOCATION_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_positive(&lookup, ENV_TIMEOUT_MS)? {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_positive(&lookup, ENV_CONNECT_TIMEOUT_MS)? {
            config.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(max) = parse_positive(&lookup, ENV_MAX_IN_FLIGHT)? {
            config.max_in_flight = Some(max as usize);
        }
        if let Some(rounds) = parse_number(&lookup, ENV_RETRY_ROUNDS)? {
            config.retry.max_rounds = u32::try_from(rounds).unwrap_or(u32::MAX);
        }
        if let Some(ms) = parse_positive(&lookup, ENV_RETRY_DELAY_MS)? {
            config.retry.initial_delay = Duration::from_millis(ms);
            config.retry.max_delay = config.retry.max_delay.max(config.retry.initial_delay);
        }

        Ok(config)
    }
}

fn parse_number<F>(lookup: &F, name: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };

    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidNumber {
            name,
            value: raw.clone(),
        })
}

fn parse_positive<F>(lookup: &F, name: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_number(lookup, name)? {
        Some(0) => Err(ConfigError::Zero { name }),
        value => Ok(value),
    }
}
