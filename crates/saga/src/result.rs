//! Terminal saga result.

use common::SagaId;

use crate::error::{CompensationError, SagaError, StepForwardError};
use crate::events::SagaEvent;
use crate::state::SagaStatus;
use crate::step::StepOutput;

/// Outcome of one [`SagaOrchestrator::execute`](crate::SagaOrchestrator::execute) call.
#[derive(Debug, Clone)]
pub struct SagaResult {
    pub saga_id: SagaId,
    pub status: SagaStatus,
    /// Index of the last step whose forward action succeeded.
    pub last_completed: Option<usize>,
    /// The forward failure that triggered unwind.
    pub cause: Option<StepForwardError>,
    /// Every compensation that failed, in the order attempted.
    pub compensation_errors: Vec<CompensationError>,
    /// Forward outputs of the completed steps, in step order.
    pub outputs: Vec<StepOutput>,
    pub journal: Vec<SagaEvent>,
}

impl SagaResult {
    pub fn is_completed(&self) -> bool {
        self.status == SagaStatus::Completed
    }

    /// Names of the steps that were successfully compensated, in unwind order.
    pub fn compensated_steps(&self) -> Vec<&str> {
        self.journal
            .iter()
            .filter_map(|event| match event {
                SagaEvent::CompensationStepCompleted(data) => Some(data.step_name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Converts into a plain `Result` for `?`-style callers.
    pub fn into_result(self) -> Result<Vec<StepOutput>, SagaError> {
        match self.cause {
            None => Ok(self.outputs),
            Some(cause) if self.compensation_errors.is_empty() => Err(SagaError::StepFailed {
                step: cause.step,
                source: cause.source,
            }),
            Some(cause) => Err(SagaError::CompensationFailed {
                failed_step: cause.step,
                step_error: cause.source,
                compensation_errors: self.compensation_errors,
            }),
        }
    }
}
