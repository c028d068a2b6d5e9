//! Resilience error types.

use std::time::Duration;

use thiserror::Error;

/// Failure reported by a remote dependency.
///
/// Operations wrapped by a breaker are free to use any error type; this one
/// covers the common shapes of a remote-call failure and knows which of them
/// say something about the health of the dependency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The dependency failed in a way that may go away on its own.
    #[error("{dependency} failed: {message}")]
    Transient { dependency: String, message: String },

    /// The dependency did not answer in time.
    #[error("{dependency} timed out after {elapsed:?}")]
    Timeout {
        dependency: String,
        elapsed: Duration,
    },

    /// The dependency rejected the request itself (bad input, business rule).
    #[error("{dependency} rejected the request: {message}")]
    Rejected { dependency: String, message: String },
}

impl RemoteError {
    pub fn transient(dependency: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            dependency: dependency.into(),
            message: message.into(),
        }
    }

    pub fn rejected(dependency: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            dependency: dependency.into(),
            message: message.into(),
        }
    }

    /// Name of the dependency that produced this error.
    pub fn dependency(&self) -> &str {
        match self {
            RemoteError::Transient { dependency, .. }
            | RemoteError::Timeout { dependency, .. }
            | RemoteError::Rejected { dependency, .. } => dependency,
        }
    }
}

/// A breaker refused to invoke its operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit breaker '{breaker}' is open")]
pub struct CircuitOpenError {
    /// Name of the breaker that fast-failed.
    pub breaker: String,
}

/// Error returned by [`CircuitBreaker::call`](crate::CircuitBreaker::call).
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The circuit is open; the operation was not invoked.
    #[error(transparent)]
    Open(CircuitOpenError),

    /// The operation ran and failed; its error is passed through unchanged.
    #[error("operation failed: {0}")]
    Inner(#[source] E),
}

impl<E> BreakerError<E> {
    /// Returns true if this is a fast-fail rather than an operation failure.
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open(_))
    }

    /// Returns the operation's own error, if the operation ran.
    pub fn into_inner(self) -> Option<E> {
        match self {
            BreakerError::Open(_) => None,
            BreakerError::Inner(e) => Some(e),
        }
    }
}

/// Invalid breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_failures must be a positive integer")]
    ZeroMaxFailures,

    #[error("reset_timeout must be a positive duration")]
    ZeroResetTimeout,

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_reports_dependency() {
        let err = RemoteError::transient("payments", "503");
        assert_eq!(err.dependency(), "payments");
        assert_eq!(err.to_string(), "payments failed: 503");
    }

    #[test]
    fn breaker_error_distinguishes_fast_fail() {
        let open: BreakerError<RemoteError> = BreakerError::Open(CircuitOpenError {
            breaker: "inventory".to_string(),
        });
        assert!(open.is_open());
        assert_eq!(open.to_string(), "circuit breaker 'inventory' is open");
        assert!(open.into_inner().is_none());

        let inner: BreakerError<RemoteError> =
            BreakerError::Inner(RemoteError::rejected("inventory", "unknown sku"));
        assert!(!inner.is_open());
        assert_eq!(
            inner.into_inner(),
            Some(RemoteError::rejected("inventory", "unknown sku"))
        );
    }
}
