//! Wiring for the demo binary: configuration, scenarios and errors.
//!
//! Runs the order fulfillment saga behind per-service circuit breakers and a
//! fan-out over three dependencies, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod scenario;

pub use config::{Config, FailPoint, LogFormat};
pub use error::DemoError;
