//! Saga status state machine.

use serde::{Deserialize, Serialize};

/// The status of a saga execution.
///
/// State transitions:
/// ```text
/// Running ──┬──► Completed
///           ├──► CompensatedFailure
///           └──► PartiallyCompensated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaStatus {
    /// Steps are executing or being compensated.
    #[default]
    Running,

    /// Every forward action succeeded (terminal state).
    Completed,

    /// A step failed and every completed step was compensated (terminal state).
    CompensatedFailure,

    /// A step failed and at least one compensation failed too (terminal
    /// state). The system may be inconsistent.
    PartiallyCompensated,
}

impl SagaStatus {
    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SagaStatus::Running)
    }

    /// Returns true if an operator has to look at the outcome.
    pub fn requires_attention(&self) -> bool {
        matches!(self, SagaStatus::PartiallyCompensated)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStatus::Running => "Running",
            SagaStatus::Completed => "Completed",
            SagaStatus::CompensatedFailure => "CompensatedFailure",
            SagaStatus::PartiallyCompensated => "PartiallyCompensated",
        }
    }
}

impl std::fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_running() {
        assert_eq!(SagaStatus::default(), SagaStatus::Running);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!SagaStatus::Running.is_terminal());
        assert!(SagaStatus::Completed.is_terminal());
        assert!(SagaStatus::CompensatedFailure.is_terminal());
        assert!(SagaStatus::PartiallyCompensated.is_terminal());
    }

    #[test]
    fn test_requires_attention() {
        assert!(!SagaStatus::Completed.requires_attention());
        assert!(!SagaStatus::CompensatedFailure.requires_attention());
        assert!(SagaStatus::PartiallyCompensated.requires_attention());
    }

    #[test]
    fn test_display() {
        assert_eq!(SagaStatus::Running.to_string(), "Running");
        assert_eq!(SagaStatus::Completed.to_string(), "Completed");
        assert_eq!(
            SagaStatus::CompensatedFailure.to_string(),
            "CompensatedFailure"
        );
        assert_eq!(
            SagaStatus::PartiallyCompensated.to_string(),
            "PartiallyCompensated"
        );
    }

    #[test]
    fn test_serialization() {
        let status = SagaStatus::PartiallyCompensated;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"PartiallyCompensated\"");
        let deserialized: SagaStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, deserialized);
    }
}
