//! The saga step capability and its adapters.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use resilience::{AllErrors, CircuitBreaker, FaultClassifier};

use crate::error::StepError;

/// What a forward action hands to its own compensation.
///
/// Typically the identifiers the compensation needs to undo the work, such
/// as a reservation or payment id.
pub type StepOutput = Option<serde_json::Value>;

/// A forward action paired with the action that semantically reverses it.
///
/// The orchestrator calls `compensate` at most once, and only after
/// `forward` succeeded, passing back exactly the output `forward` returned.
#[async_trait]
pub trait SagaStep: Send + Sync {
    /// Identifier for logs and the journal; never used for control flow.
    fn name(&self) -> &str;

    async fn forward(&self) -> Result<StepOutput, StepError>;

    async fn compensate(&self, output: &StepOutput) -> Result<(), StepError>;

    /// Human-readable description of the undo.
    fn compensation_description(&self) -> String {
        format!("undo {}", self.name())
    }
}

/// A step built from a pair of closures.
///
/// The compensation closure receives its own copy of the forward output.
///
/// ```rust
/// use saga::{FnStep, SagaStep};
/// use serde_json::json;
///
/// let step = FnStep::new(
///     "reserve_seat",
///     || async { Ok(Some(json!({"seat": "12A"}))) },
///     |_output| async { Ok(()) },
/// )
/// .with_description("release seat");
/// assert_eq!(step.compensation_description(), "release seat");
/// ```
pub struct FnStep<F, G> {
    name: String,
    description: Option<String>,
    forward: F,
    compensate: G,
}

impl<F, G> FnStep<F, G> {
    pub fn new<FFut, GFut>(name: impl Into<String>, forward: F, compensate: G) -> Self
    where
        F: Fn() -> FFut + Send + Sync,
        FFut: Future<Output = Result<StepOutput, StepError>> + Send,
        G: Fn(StepOutput) -> GFut + Send + Sync,
        GFut: Future<Output = Result<(), StepError>> + Send,
    {
        Self {
            name: name.into(),
            description: None,
            forward,
            compensate,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl<F, G> fmt::Debug for FnStep<F, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, FFut, G, GFut> SagaStep for FnStep<F, G>
where
    F: Fn() -> FFut + Send + Sync,
    FFut: Future<Output = Result<StepOutput, StepError>> + Send,
    G: Fn(StepOutput) -> GFut + Send + Sync,
    GFut: Future<Output = Result<(), StepError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn forward(&self) -> Result<StepOutput, StepError> {
        (self.forward)().await
    }

    async fn compensate(&self, output: &StepOutput) -> Result<(), StepError> {
        (self.compensate)(output.clone()).await
    }

    fn compensation_description(&self) -> String {
        match &self.description {
            Some(description) => description.clone(),
            None => format!("undo {}", self.name),
        }
    }
}

/// Routes a step's forward action through a shared circuit breaker.
///
/// A fast-fail surfaces as [`StepError::CircuitOpen`]. Compensations bypass
/// the breaker: a tripped circuit must never skip an undo.
pub struct ProtectedStep<S, C = AllErrors> {
    inner: S,
    breaker: Arc<CircuitBreaker<C>>,
}

impl<S, C> ProtectedStep<S, C> {
    pub fn new(inner: S, breaker: Arc<CircuitBreaker<C>>) -> Self {
        Self { inner, breaker }
    }

    pub fn breaker(&self) -> &CircuitBreaker<C> {
        &self.breaker
    }
}

#[async_trait]
impl<S, C> SagaStep for ProtectedStep<S, C>
where
    S: SagaStep,
    C: FaultClassifier<StepError>,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn forward(&self) -> Result<StepOutput, StepError> {
        Ok(self.breaker.call(|| self.inner.forward()).await?)
    }

    async fn compensate(&self, output: &StepOutput) -> Result<(), StepError> {
        self.inner.compensate(output).await
    }

    fn compensation_description(&self) -> String {
        self.inner.compensation_description()
    }
}
