//! Saga error types.

use std::time::Duration;

use resilience::{BreakerError, CircuitOpenError, RemoteError, TransientFault};
use thiserror::Error;

/// Error reported by a step's forward or compensating action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// The remote dependency behind the step failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The step's breaker fast-failed; the action was not attempted.
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    /// The saga's time budget ran out before the forward action finished.
    #[error("saga deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// The action panicked; the payload message is preserved.
    #[error("step panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

impl StepError {
    pub fn other(message: impl Into<String>) -> Self {
        StepError::Other(message.into())
    }
}

impl From<BreakerError<StepError>> for StepError {
    fn from(error: BreakerError<StepError>) -> Self {
        match error {
            BreakerError::Open(open) => StepError::CircuitOpen(open),
            BreakerError::Inner(inner) => inner,
        }
    }
}

impl TransientFault for StepError {
    fn is_transient(&self) -> bool {
        match self {
            StepError::Remote(remote) => remote.is_transient(),
            StepError::DeadlineExceeded(_) => true,
            StepError::CircuitOpen(_) | StepError::Panicked(_) | StepError::Other(_) => false,
        }
    }
}

/// A forward action failed and aborted the saga.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("step {index} ('{step}') failed: {source}")]
pub struct StepForwardError {
    pub step: String,
    pub index: usize,
    #[source]
    pub source: StepError,
}

/// A compensating action failed during unwind.
///
/// Collected rather than raised; the remaining compensations still run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("compensation '{description}' for step {index} ('{step}') failed: {source}")]
pub struct CompensationError {
    pub step: String,
    pub index: usize,
    pub description: String,
    #[source]
    pub source: StepError,
}

/// Terminal failure of a saga, for callers that want a plain `Result`.
#[derive(Debug, Clone, Error)]
pub enum SagaError {
    /// A step failed and every completed step was compensated.
    #[error("saga aborted at step '{step}': {source}")]
    StepFailed {
        step: String,
        #[source]
        source: StepError,
    },

    /// A step failed and at least one compensation failed as well.
    ///
    /// The system may be left inconsistent; this needs operator attention.
    #[error(
        "saga aborted at step '{failed_step}' and {} compensation(s) failed",
        .compensation_errors.len()
    )]
    CompensationFailed {
        failed_step: String,
        step_error: StepError,
        compensation_errors: Vec<CompensationError>,
    },
}
