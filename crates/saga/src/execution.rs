//! Per-execution saga record.

use common::SagaId;

use crate::error::{CompensationError, StepForwardError};
use crate::events::SagaEvent;
use crate::result::SagaResult;
use crate::state::SagaStatus;
use crate::step::StepOutput;

/// Everything known about one saga execution while it runs.
///
/// State only changes by recording journal events, so the journal and the
/// derived fields can never disagree. Typed errors travel alongside the
/// events that announce them.
#[derive(Debug)]
pub struct SagaExecution {
    saga_id: SagaId,
    status: SagaStatus,
    last_completed: Option<usize>,
    cause: Option<StepForwardError>,
    compensation_errors: Vec<CompensationError>,
    outputs: Vec<StepOutput>,
    journal: Vec<SagaEvent>,
}

impl SagaExecution {
    pub fn new(saga_id: SagaId) -> Self {
        Self {
            saga_id,
            status: SagaStatus::Running,
            last_completed: None,
            cause: None,
            compensation_errors: Vec::new(),
            outputs: Vec::new(),
            journal: Vec::new(),
        }
    }

    /// Applies an event and appends it to the journal.
    pub fn record(&mut self, event: SagaEvent) {
        self.apply(&event);
        self.journal.push(event);
    }

    /// Records the forward failure that aborts the saga.
    pub fn fail_step(&mut self, error: StepForwardError) {
        self.record(SagaEvent::step_failed(
            error.index,
            error.step.clone(),
            error.source.to_string(),
        ));
        self.cause = Some(error);
    }

    /// Records a compensation failure; unwind carries on.
    pub fn fail_compensation(&mut self, error: CompensationError) {
        self.record(SagaEvent::compensation_step_failed(
            error.index,
            error.step.clone(),
            error.source.to_string(),
        ));
        self.compensation_errors.push(error);
    }

    fn apply(&mut self, event: &SagaEvent) {
        match event {
            SagaEvent::SagaStarted(_) => {
                self.status = SagaStatus::Running;
            }
            SagaEvent::StepCompleted(data) => {
                self.last_completed = Some(data.index);
                self.outputs.push(data.output.clone());
            }
            SagaEvent::CompensationStepFailed(_) => {
                self.status = SagaStatus::PartiallyCompensated;
            }
            SagaEvent::SagaCompleted(_) => {
                self.status = SagaStatus::Completed;
            }
            SagaEvent::SagaFailed(data) => {
                self.status = data.status;
            }
            SagaEvent::StepStarted(_)
            | SagaEvent::StepFailed(_)
            | SagaEvent::CompensationStarted(_)
            | SagaEvent::CompensationStepCompleted(_) => {}
        }
    }

    pub fn saga_id(&self) -> SagaId {
        self.saga_id
    }

    pub fn status(&self) -> SagaStatus {
        self.status
    }

    pub fn last_completed(&self) -> Option<usize> {
        self.last_completed
    }

    pub fn cause(&self) -> Option<&StepForwardError> {
        self.cause.as_ref()
    }

    pub fn compensation_errors(&self) -> &[CompensationError] {
        &self.compensation_errors
    }

    pub fn journal(&self) -> &[SagaEvent] {
        &self.journal
    }

    /// Consumes the record into the caller-facing result.
    pub fn finish(self) -> SagaResult {
        SagaResult {
            saga_id: self.saga_id,
            status: self.status,
            last_completed: self.last_completed,
            cause: self.cause,
            compensation_errors: self.compensation_errors,
            outputs: self.outputs,
            journal: self.journal,
        }
    }
}
