//! Shared identifiers and value objects.
//!
//! Nothing in here carries behaviour beyond construction, formatting and
//! arithmetic; the resilience and saga crates build on these types.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{CustomerId, OrderId, ProductId, SagaId};
