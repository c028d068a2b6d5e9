//! Saga orchestrator.
//!
//! Runs an ordered list of steps sequentially in the caller's task. On the
//! first forward failure it unwinds: every completed step is compensated in
//! reverse order of completion, and every compensation is attempted even if
//! an earlier one failed.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use common::SagaId;
use futures_util::FutureExt;
use resilience::ConfigError;
use tokio::time::Instant;

use crate::error::{CompensationError, StepError, StepForwardError};
use crate::events::SagaEvent;
use crate::execution::SagaExecution;
use crate::ledger::CompensationLedger;
use crate::result::SagaResult;
use crate::state::SagaStatus;
use crate::step::{SagaStep, StepOutput};

/// Environment variable holding the saga deadline in milliseconds.
pub const SAGA_DEADLINE_ENV: &str = "SAGA_DEADLINE_MS";

/// Execution options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SagaOptions {
    /// Budget for all forward actions together. Compensations are not bounded.
    pub deadline: Option<Duration>,
}

impl SagaOptions {
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// Loads options from the environment.
    ///
    /// `SAGA_DEADLINE_MS` unset or empty means no deadline.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = match std::env::var(SAGA_DEADLINE_ENV) {
            Ok(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(Self::default()),
        };

        let invalid = || ConfigError::InvalidEnv {
            key: SAGA_DEADLINE_ENV.to_string(),
            value: raw.clone(),
        };
        let millis: u64 = raw.trim().parse().map_err(|_| invalid())?;
        if millis == 0 {
            return Err(invalid());
        }
        Ok(Self::with_deadline(Duration::from_millis(millis)))
    }
}

/// Executes sagas.
///
/// The orchestrator holds no per-execution state, so one instance can run
/// any number of sagas, concurrently or in sequence, each with its own
/// ledger and journal.
#[derive(Debug, Clone, Default)]
pub struct SagaOrchestrator {
    options: SagaOptions,
}

impl SagaOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SagaOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SagaOptions {
        &self.options
    }

    /// Runs `steps` in order, unwinding completed steps on the first failure.
    ///
    /// Never returns early with an error: every outcome, including
    /// compensation failures, is described by the returned [`SagaResult`].
    #[tracing::instrument(skip_all, fields(saga_id = tracing::field::Empty, steps = steps.len()))]
    pub async fn execute(&self, steps: &[Box<dyn SagaStep>]) -> SagaResult {
        let saga_id = SagaId::new();
        tracing::Span::current().record("saga_id", tracing::field::display(saga_id));
        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = std::time::Instant::now();
        let deadline = self.options.deadline.map(|budget| Instant::now() + budget);

        let mut execution = SagaExecution::new(saga_id);
        execution.record(SagaEvent::saga_started(saga_id, steps.len()));
        let mut ledger = CompensationLedger::new();

        for (index, step) in steps.iter().enumerate() {
            let step = step.as_ref();
            tracing::info!(step = step.name(), index, "saga step started");
            execution.record(SagaEvent::step_started(index, step.name()));

            match self.run_forward(step, deadline).await {
                Ok(output) => {
                    tracing::info!(step = step.name(), index, "saga step completed");
                    execution.record(SagaEvent::step_completed(index, step.name(), output.clone()));
                    ledger.push(index, step, output);
                }
                Err(error) => {
                    tracing::warn!(
                        step = step.name(),
                        index,
                        error = %error,
                        owed = ledger.len(),
                        "saga step failed, compensating"
                    );
                    let reason = error.to_string();
                    execution.fail_step(StepForwardError {
                        step: step.name().to_string(),
                        index,
                        source: error,
                    });
                    Self::unwind(&mut execution, ledger, step.name()).await;

                    let status = if execution.compensation_errors().is_empty() {
                        metrics::counter!("saga_compensated").increment(1);
                        SagaStatus::CompensatedFailure
                    } else {
                        metrics::counter!("saga_partially_compensated").increment(1);
                        SagaStatus::PartiallyCompensated
                    };
                    execution.record(SagaEvent::saga_failed(status, reason));
                    metrics::histogram!("saga_duration_seconds")
                        .record(saga_start.elapsed().as_secs_f64());
                    tracing::info!(%saga_id, %status, "saga finished after compensation");
                    return execution.finish();
                }
            }
        }

        execution.record(SagaEvent::saga_completed());
        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);
        metrics::counter!("saga_completed").increment(1);
        tracing::info!(%saga_id, duration, "saga completed successfully");
        execution.finish()
    }

    /// Runs one forward action under the deadline with panics contained.
    async fn run_forward(
        &self,
        step: &dyn SagaStep,
        deadline: Option<Instant>,
    ) -> Result<StepOutput, StepError> {
        let forward = AssertUnwindSafe(step.forward()).catch_unwind();

        let outcome = match (deadline, self.options.deadline) {
            (Some(at), Some(budget)) => {
                if Instant::now() >= at {
                    return Err(StepError::DeadlineExceeded(budget));
                }
                tokio::time::timeout_at(at, forward)
                    .await
                    .map_err(|_| StepError::DeadlineExceeded(budget))?
            }
            _ => forward.await,
        };

        match outcome {
            Ok(result) => result,
            Err(payload) => Err(StepError::Panicked(panic_message(&*payload))),
        }
    }

    /// Drains the ledger, compensating the most recent work first.
    async fn unwind(
        execution: &mut SagaExecution,
        mut ledger: CompensationLedger<'_>,
        failed_step: &str,
    ) {
        execution.record(SagaEvent::compensation_started(failed_step, ledger.len()));

        while let Some(entry) = ledger.pop() {
            let name = entry.step.name();
            tracing::info!(step = name, index = entry.index, "compensating step");

            let outcome = AssertUnwindSafe(entry.step.compensate(&entry.output))
                .catch_unwind()
                .await;
            let result = match outcome {
                Ok(result) => result,
                Err(payload) => Err(StepError::Panicked(panic_message(&*payload))),
            };

            match result {
                Ok(()) => {
                    execution.record(SagaEvent::compensation_step_completed(entry.index, name));
                }
                Err(error) => {
                    let description = entry.step.compensation_description();
                    tracing::error!(
                        step = name,
                        index = entry.index,
                        compensation = %description,
                        error = %error,
                        "compensation failed, continuing unwind"
                    );
                    metrics::counter!("saga_compensation_failures_total").increment(1);
                    execution.fail_compensation(CompensationError {
                        step: name.to_string(),
                        index: entry.index,
                        description,
                        source: error,
                    });
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
