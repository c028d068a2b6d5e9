//! Fault classification.
//!
//! A breaker only learns from errors that say something about the health of
//! the dependency. Which errors those are is a policy decision, so it is a
//! type parameter of the breaker rather than "any error counts".

use crate::error::RemoteError;

/// Verdict on a single operation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The dependency behaved; resets the consecutive-failure count.
    Success,
    /// The dependency is misbehaving; counts toward opening the circuit.
    Failure,
}

/// Maps an operation's error to an [`Outcome`].
///
/// `Ok` results are always [`Outcome::Success`]; implementations only decide
/// about errors. Classification must be pure: the same error always yields
/// the same outcome.
pub trait FaultClassifier<E>: Send + Sync {
    fn classify(&self, error: &E) -> Outcome;
}

/// Counts every error as a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllErrors;

impl<E> FaultClassifier<E> for AllErrors {
    fn classify(&self, _error: &E) -> Outcome {
        Outcome::Failure
    }
}

/// Errors that know whether they indicate a dependency fault.
pub trait TransientFault {
    /// True if the error says the dependency itself is unhealthy.
    fn is_transient(&self) -> bool;
}

impl TransientFault for RemoteError {
    fn is_transient(&self) -> bool {
        !matches!(self, RemoteError::Rejected { .. })
    }
}

/// Counts only transient faults; rejected requests leave the breaker alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransientOnly;

impl<E: TransientFault> FaultClassifier<E> for TransientOnly {
    fn classify(&self, error: &E) -> Outcome {
        if error.is_transient() {
            Outcome::Failure
        } else {
            Outcome::Success
        }
    }
}

/// Classifies with a caller-supplied predicate returning true for failures.
#[derive(Clone)]
pub struct PredicateClassifier<F> {
    predicate: F,
}

impl<F> PredicateClassifier<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> std::fmt::Debug for PredicateClassifier<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateClassifier").finish_non_exhaustive()
    }
}

impl<E, F> FaultClassifier<E> for PredicateClassifier<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn classify(&self, error: &E) -> Outcome {
        if (self.predicate)(error) {
            Outcome::Failure
        } else {
            Outcome::Success
        }
    }
}
