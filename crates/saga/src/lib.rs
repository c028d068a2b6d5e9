//! Saga orchestration with compensating actions.
//!
//! A saga is an ordered list of [`SagaStep`]s, each pairing a forward action
//! with the action that undoes it. [`SagaOrchestrator::execute`] runs the
//! forward actions in order; if one fails, every step that already completed
//! is compensated in reverse order and the outcome is reported as a
//! [`SagaResult`].
//!
//! The [`fulfillment`] module contains a complete order fulfillment saga:
//! 1. Create order
//! 2. Reserve inventory
//! 3. Charge payment
//!
//! Forward actions may be protected by a [`resilience::CircuitBreaker`]
//! through [`ProtectedStep`]; compensations never are.

pub mod error;
pub mod events;
pub mod execution;
pub mod fulfillment;
pub mod ledger;
pub mod orchestrator;
pub mod result;
pub mod state;
pub mod step;

pub use error::{CompensationError, SagaError, StepError, StepForwardError};
pub use events::SagaEvent;
pub use execution::SagaExecution;
pub use fulfillment::{
    FulfillmentBreakers, FulfillmentRequest, InMemoryInventoryService, InMemoryOrderService,
    InMemoryPaymentService, InventoryService, OrderLine, OrderService, PaymentService,
    order_fulfillment_steps,
};
pub use ledger::{CompensationLedger, LedgerEntry};
pub use orchestrator::{SagaOptions, SagaOrchestrator};
pub use result::SagaResult;
pub use state::SagaStatus;
pub use step::{FnStep, ProtectedStep, SagaStep, StepOutput};
