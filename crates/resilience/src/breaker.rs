//! Circuit breaker.
//!
//! A breaker guards one logical remote dependency. It counts consecutive
//! failures (as judged by its [`FaultClassifier`]) and, once the threshold is
//! reached, fast-fails every call until the reset timeout elapses. The first
//! call after that is the single trial: if it succeeds the circuit closes, if
//! it fails the circuit re-opens and the timeout starts over.
//!
//! Breakers are long-lived and shared by reference (`&` or `Arc`) between
//! every call site that talks to the same dependency. State is guarded by an
//! `RwLock` that is never held across an `.await`.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use resilience::{CircuitBreaker, CircuitBreakerConfig, RemoteError};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let breaker = CircuitBreaker::new(
//!     "payments",
//!     CircuitBreakerConfig::new(3, Duration::from_secs(10)),
//! )?;
//!
//! let charged = breaker
//!     .call(|| async { Ok::<_, RemoteError>("PAY-0001") })
//!     .await?;
//! assert_eq!(charged, "PAY-0001");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::time::Instant;

use crate::classifier::{AllErrors, FaultClassifier, Outcome};
use crate::config::CircuitBreakerConfig;
use crate::error::{BreakerError, CircuitOpenError, ConfigError};
use crate::state::CircuitState;

#[derive(Debug, Default)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    trial_in_flight: bool,
    /// Bumped on every transition and reset. A result only counts if the
    /// call was admitted in the current generation.
    generation: u64,
}

/// How a call was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permit {
    Normal,
    Trial,
}

/// Point-in-time view of a breaker, for health endpoints and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerStats {
    pub state: CircuitState,
    /// Consecutive failures; frozen at the threshold while open.
    pub failure_count: u32,
    pub last_failure: Option<Instant>,
    /// Calls that actually invoked the operation.
    pub total_calls: u64,
    /// Calls whose outcome was classified as a failure.
    pub total_failures: u64,
    /// Calls rejected without invoking the operation.
    pub total_rejected: u64,
}

/// Circuit breaker protecting a single remote dependency.
///
/// The classifier decides which errors count against the dependency; the
/// default [`AllErrors`] counts every error.
pub struct CircuitBreaker<C = AllErrors> {
    name: String,
    config: CircuitBreakerConfig,
    classifier: C,
    inner: RwLock<BreakerInner>,
    total_calls: AtomicU64,
    total_failures: AtomicU64,
    total_rejected: AtomicU64,
}

impl CircuitBreaker<AllErrors> {
    /// Creates a breaker that counts every error as a failure.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Result<Self, ConfigError> {
        Self::with_classifier(name, config, AllErrors)
    }
}

impl<C> CircuitBreaker<C> {
    /// Creates a breaker with an explicit classification policy.
    pub fn with_classifier(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        classifier: C,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
            classifier,
            inner: RwLock::new(BreakerInner::default()),
            total_calls: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            total_rejected: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Returns the current state.
    ///
    /// An open breaker whose timeout has elapsed still reports `Open`; the
    /// move to `HalfOpen` happens when the next call arrives.
    pub fn state(&self) -> CircuitState {
        self.read().state
    }

    pub fn failure_count(&self) -> u32 {
        self.read().failure_count
    }

    pub fn stats(&self) -> BreakerStats {
        let inner = self.read();
        BreakerStats {
            state: inner.state,
            failure_count: inner.failure_count,
            last_failure: inner.last_failure,
            total_calls: self.total_calls.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
        }
    }

    /// Forces the breaker back to `Closed` with a zero failure count.
    ///
    /// Meant for operators and tests; normal recovery goes through the trial.
    pub fn reset(&self) {
        let mut inner = self.write();
        let from = inner.state;
        inner.failure_count = 0;
        inner.last_failure = None;
        inner.trial_in_flight = false;
        if from == CircuitState::Closed {
            inner.generation = inner.generation.wrapping_add(1);
        } else {
            self.transition(&mut inner, CircuitState::Closed);
        }
        tracing::info!(
            circuit_breaker = %self.name,
            from = %from,
            "circuit breaker manually reset to Closed"
        );
    }

    /// Executes `operation` if the circuit admits it.
    ///
    /// Returns `BreakerError::Open` without invoking `operation` while the
    /// circuit is open, or while another caller holds the half-open trial.
    /// Otherwise the operation's own result is returned, its error wrapped in
    /// `BreakerError::Inner` but otherwise untouched.
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        C: FaultClassifier<E>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let admission = self.admit().map_err(BreakerError::Open)?;

        self.total_calls.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("circuit_breaker_calls_total", "breaker" => self.name.clone())
            .increment(1);

        let result = operation().await;

        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(error) => self.classifier.classify(error),
        };
        match outcome {
            Outcome::Success => admission.succeed(),
            Outcome::Failure => admission.fail(),
        }

        result.map_err(BreakerError::Inner)
    }

    /// Decides whether a call may proceed, taking the trial permit if needed.
    ///
    /// The fast path only takes the read lock. Any decision that changes
    /// state is re-checked under the write lock so two callers cannot both
    /// become the trial.
    fn admit(&self) -> Result<Admission<'_, C>, CircuitOpenError> {
        {
            let inner = self.read();
            match inner.state {
                CircuitState::Closed => {
                    return Ok(Admission::new(self, Permit::Normal, inner.generation));
                }
                CircuitState::Open if !self.reset_timeout_elapsed(&inner) => {
                    return Err(self.reject(inner.state));
                }
                CircuitState::HalfOpen if inner.trial_in_flight => {
                    return Err(self.reject(inner.state));
                }
                CircuitState::Open | CircuitState::HalfOpen => {}
            }
        }

        let mut inner = self.write();
        match inner.state {
            CircuitState::Closed => Ok(Admission::new(self, Permit::Normal, inner.generation)),
            CircuitState::Open => {
                if !self.reset_timeout_elapsed(&inner) {
                    return Err(self.reject(inner.state));
                }
                self.transition(&mut inner, CircuitState::HalfOpen);
                inner.trial_in_flight = true;
                tracing::info!(
                    circuit_breaker = %self.name,
                    state = "Open -> HalfOpen",
                    "circuit breaker admitting trial call"
                );
                Ok(Admission::new(self, Permit::Trial, inner.generation))
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    return Err(self.reject(inner.state));
                }
                inner.trial_in_flight = true;
                Ok(Admission::new(self, Permit::Trial, inner.generation))
            }
        }
    }

    fn reset_timeout_elapsed(&self, inner: &BreakerInner) -> bool {
        inner
            .last_failure
            .is_none_or(|at| at.elapsed() >= self.config.reset_timeout)
    }

    fn reject(&self, state: CircuitState) -> CircuitOpenError {
        self.total_rejected.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("circuit_breaker_rejected_total", "breaker" => self.name.clone())
            .increment(1);
        tracing::debug!(circuit_breaker = %self.name, %state, "call rejected");
        CircuitOpenError {
            breaker: self.name.clone(),
        }
    }

    fn record_success(&self, permit: Permit, generation: u64) {
        let mut inner = self.write();
        if self.is_stale(&inner, generation) {
            return;
        }
        match (permit, inner.state) {
            (Permit::Trial, CircuitState::HalfOpen) => {
                inner.trial_in_flight = false;
                inner.failure_count = 0;
                self.transition(&mut inner, CircuitState::Closed);
                tracing::info!(
                    circuit_breaker = %self.name,
                    state = "HalfOpen -> Closed",
                    "circuit breaker closed after successful trial"
                );
            }
            (Permit::Normal, CircuitState::Closed) => inner.failure_count = 0,
            _ => {}
        }
    }

    fn record_failure(&self, permit: Permit, generation: u64) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("circuit_breaker_failures_total", "breaker" => self.name.clone())
            .increment(1);

        let mut inner = self.write();
        if self.is_stale(&inner, generation) {
            return;
        }
        match (permit, inner.state) {
            (Permit::Trial, CircuitState::HalfOpen) => {
                inner.trial_in_flight = false;
                inner.failure_count = self.config.max_failures;
                inner.last_failure = Some(Instant::now());
                self.transition(&mut inner, CircuitState::Open);
                tracing::warn!(
                    circuit_breaker = %self.name,
                    state = "HalfOpen -> Open",
                    "circuit breaker re-opened after failed trial"
                );
            }
            (Permit::Normal, CircuitState::Closed) => {
                inner.failure_count = inner.failure_count.saturating_add(1);
                inner.last_failure = Some(Instant::now());
                if inner.failure_count >= self.config.max_failures {
                    self.transition(&mut inner, CircuitState::Open);
                    tracing::warn!(
                        circuit_breaker = %self.name,
                        state = "Closed -> Open",
                        consecutive_failures = inner.failure_count,
                        max_failures = self.config.max_failures,
                        "circuit breaker opened due to consecutive failures"
                    );
                }
            }
            _ => {}
        }
    }

    /// A call admitted before the latest transition or reset no longer
    /// speaks for the dependency's current health.
    fn is_stale(&self, inner: &BreakerInner, generation: u64) -> bool {
        let stale = inner.generation != generation;
        if stale {
            tracing::debug!(
                circuit_breaker = %self.name,
                state = %inner.state,
                "ignoring result of call admitted before the last transition"
            );
        }
        stale
    }

    /// Releases a trial permit whose call never reported back.
    fn abandon_trial(&self, generation: u64) {
        let mut inner = self.write();
        if inner.state == CircuitState::HalfOpen && inner.generation == generation {
            inner.trial_in_flight = false;
            tracing::debug!(circuit_breaker = %self.name, "trial call abandoned");
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        inner.generation = inner.generation.wrapping_add(1);
        metrics::counter!(
            "circuit_breaker_transitions_total",
            "breaker" => self.name.clone(),
            "from" => from.as_str(),
            "to" => to.as_str()
        )
        .increment(1);
    }

    fn read(&self) -> RwLockReadGuard<'_, BreakerInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BreakerInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &stats.state)
            .field("failure_count", &stats.failure_count)
            .field("total_calls", &stats.total_calls)
            .field("total_failures", &stats.total_failures)
            .field("total_rejected", &stats.total_rejected)
            .field("config", &self.config)
            .finish()
    }
}

/// An admitted call.
///
/// Dropping it unresolved (the caller's future was cancelled, or the
/// operation panicked) hands a trial permit back so the breaker does not
/// stay half-open forever.
struct Admission<'a, C> {
    breaker: &'a CircuitBreaker<C>,
    permit: Permit,
    generation: u64,
    resolved: bool,
}

impl<'a, C> Admission<'a, C> {
    fn new(breaker: &'a CircuitBreaker<C>, permit: Permit, generation: u64) -> Self {
        Self {
            breaker,
            permit,
            generation,
            resolved: false,
        }
    }

    fn succeed(mut self) {
        self.resolved = true;
        self.breaker.record_success(self.permit, self.generation);
    }

    fn fail(mut self) {
        self.resolved = true;
        self.breaker.record_failure(self.permit, self.generation);
    }
}

impl<C> Drop for Admission<'_, C> {
    fn drop(&mut self) {
        if !self.resolved && self.permit == Permit::Trial {
            self.breaker.abandon_trial(self.generation);
        }
    }
}
