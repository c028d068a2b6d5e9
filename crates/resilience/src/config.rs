//! Breaker configuration.

use std::time::Duration;

use crate::error::ConfigError;

/// Thresholds for a circuit breaker.
///
/// Both values are immutable once the breaker is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub max_failures: u32,
    /// How long an open circuit fast-fails before admitting a trial call.
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new(max_failures: u32, reset_timeout: Duration) -> Self {
        Self {
            max_failures,
            reset_timeout,
        }
    }

    /// Rejects zero thresholds and zero timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_failures == 0 {
            return Err(ConfigError::ZeroMaxFailures);
        }
        if self.reset_timeout.is_zero() {
            return Err(ConfigError::ZeroResetTimeout);
        }
        Ok(())
    }

    /// Loads configuration from environment variables, falling back to defaults.
    ///
    /// Reads `<PREFIX>_MAX_FAILURES` and `<PREFIX>_RESET_TIMEOUT_SECS`. A
    /// variable that is set but unparsable is an error rather than a silent
    /// fallback.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_failures = match env_var(prefix, "MAX_FAILURES") {
            Some((key, value)) => value
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { key, value })?,
            None => defaults.max_failures,
        };

        let reset_timeout = match env_var(prefix, "RESET_TIMEOUT_SECS") {
            Some((key, value)) => value
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidEnv { key, value })?,
            None => defaults.reset_timeout,
        };

        let config = Self {
            max_failures,
            reset_timeout,
        };
        config.validate()?;
        Ok(config)
    }
}

fn env_var(prefix: &str, suffix: &str) -> Option<(String, String)> {
    let key = format!("{prefix}_{suffix}");
    std::env::var(&key).ok().map(|value| (key, value))
}
