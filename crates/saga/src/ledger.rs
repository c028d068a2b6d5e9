//! Compensation ledger.

use crate::step::{SagaStep, StepOutput};

/// A compensation owed for one successful forward action.
pub struct LedgerEntry<'a> {
    /// Position of the step in the saga.
    pub index: usize,
    pub step: &'a dyn SagaStep,
    /// The forward action's output, handed to `compensate` verbatim.
    pub output: StepOutput,
}

impl std::fmt::Debug for LedgerEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEntry")
            .field("index", &self.index)
            .field("step", &self.step.name())
            .field("output", &self.output)
            .finish()
    }
}

/// LIFO record of the compensations owed during one saga execution.
///
/// Entries are pushed in forward order and popped in reverse, so unwinding
/// undoes the most recent work first.
#[derive(Debug, Default)]
pub struct CompensationLedger<'a> {
    entries: Vec<LedgerEntry<'a>>,
}

impl<'a> CompensationLedger<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, index: usize, step: &'a dyn SagaStep, output: StepOutput) {
        self.entries.push(LedgerEntry {
            index,
            step,
            output,
        });
    }

    pub fn pop(&mut self) -> Option<LedgerEntry<'a>> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Step names in the order they would be compensated.
    pub fn owed(&self) -> Vec<&str> {
        self.entries.iter().rev().map(|e| e.step.name()).collect()
    }
}
