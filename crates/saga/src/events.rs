//! Saga journal events.

use chrono::{DateTime, Utc};
use common::SagaId;
use serde::{Deserialize, Serialize};

use crate::state::SagaStatus;
use crate::step::StepOutput;

/// Events recorded while a saga executes, in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SagaEvent {
    /// Saga execution started.
    SagaStarted(SagaStartedData),

    /// A step's forward action started.
    StepStarted(StepData),

    /// A step's forward action completed successfully.
    StepCompleted(StepCompletedData),

    /// A step's forward action failed; unwind follows.
    StepFailed(StepFailedData),

    /// Unwind started after a step failure.
    CompensationStarted(CompensationData),

    /// A compensation completed successfully.
    CompensationStepCompleted(StepData),

    /// A compensation failed (recorded, unwind continues).
    CompensationStepFailed(StepFailedData),

    /// Every step completed.
    SagaCompleted(SagaCompletedData),

    /// The saga ended after unwinding.
    SagaFailed(SagaFailedData),
}

impl SagaEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SagaEvent::SagaStarted(_) => "SagaStarted",
            SagaEvent::StepStarted(_) => "StepStarted",
            SagaEvent::StepCompleted(_) => "StepCompleted",
            SagaEvent::StepFailed(_) => "StepFailed",
            SagaEvent::CompensationStarted(_) => "CompensationStarted",
            SagaEvent::CompensationStepCompleted(_) => "CompensationStepCompleted",
            SagaEvent::CompensationStepFailed(_) => "CompensationStepFailed",
            SagaEvent::SagaCompleted(_) => "SagaCompleted",
            SagaEvent::SagaFailed(_) => "SagaFailed",
        }
    }
}

/// Data for SagaStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaStartedData {
    /// The saga execution ID.
    pub saga_id: SagaId,
    /// Number of steps in the saga.
    pub steps: usize,
    /// When the saga started.
    pub started_at: DateTime<Utc>,
}

/// Data for step started and compensation completed events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepData {
    /// Position of the step in the saga.
    pub index: usize,
    /// The step name.
    pub step_name: String,
}

/// Data for StepCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCompletedData {
    pub index: usize,
    pub step_name: String,
    /// What the forward action produced; handed back to its compensation.
    pub output: StepOutput,
}

/// Data for StepFailed and CompensationStepFailed events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailedData {
    pub index: usize,
    pub step_name: String,
    /// Error message describing the failure.
    pub error: String,
}

/// Data for CompensationStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationData {
    /// The step whose failure triggered unwind.
    pub from_step: String,
    /// Number of compensations owed.
    pub owed: usize,
}

/// Data for SagaCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaCompletedData {
    pub completed_at: DateTime<Utc>,
}

/// Data for SagaFailed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaFailedData {
    /// Either `CompensatedFailure` or `PartiallyCompensated`.
    pub status: SagaStatus,
    /// Reason for failure.
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

// Convenience constructors
impl SagaEvent {
    pub fn saga_started(saga_id: SagaId, steps: usize) -> Self {
        SagaEvent::SagaStarted(SagaStartedData {
            saga_id,
            steps,
            started_at: Utc::now(),
        })
    }

    pub fn step_started(index: usize, step_name: impl Into<String>) -> Self {
        SagaEvent::StepStarted(StepData {
            index,
            step_name: step_name.into(),
        })
    }

    pub fn step_completed(index: usize, step_name: impl Into<String>, output: StepOutput) -> Self {
        SagaEvent::StepCompleted(StepCompletedData {
            index,
            step_name: step_name.into(),
            output,
        })
    }

    pub fn step_failed(
        index: usize,
        step_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        SagaEvent::StepFailed(StepFailedData {
            index,
            step_name: step_name.into(),
            error: error.into(),
        })
    }

    pub fn compensation_started(from_step: impl Into<String>, owed: usize) -> Self {
        SagaEvent::CompensationStarted(CompensationData {
            from_step: from_step.into(),
            owed,
        })
    }

    pub fn compensation_step_completed(index: usize, step_name: impl Into<String>) -> Self {
        SagaEvent::CompensationStepCompleted(StepData {
            index,
            step_name: step_name.into(),
        })
    }

    pub fn compensation_step_failed(
        index: usize,
        step_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        SagaEvent::CompensationStepFailed(StepFailedData {
            index,
            step_name: step_name.into(),
            error: error.into(),
        })
    }

    pub fn saga_completed() -> Self {
        SagaEvent::SagaCompleted(SagaCompletedData {
            completed_at: Utc::now(),
        })
    }

    pub fn saga_failed(status: SagaStatus, reason: impl Into<String>) -> Self {
        SagaEvent::SagaFailed(SagaFailedData {
            status,
            reason: reason.into(),
            failed_at: Utc::now(),
        })
    }
}
