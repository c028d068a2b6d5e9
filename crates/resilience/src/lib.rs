//! Fault isolation for calls to remote dependencies.
//!
//! This crate provides:
//! - [`CircuitBreaker`]: a per-dependency gate that stops calling a failing
//!   dependency and probes for recovery with a single trial call
//! - [`FaultClassifier`]: the policy deciding which errors count against a
//!   dependency
//! - [`FanOut`]: concurrent calls to several protected dependencies with a
//!   bounded wait
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use resilience::{
//!     BreakerError, CircuitBreaker, CircuitBreakerConfig, RemoteError, TransientOnly,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let inventory = CircuitBreaker::with_classifier(
//!     "inventory",
//!     CircuitBreakerConfig::new(3, Duration::from_secs(10)),
//!     TransientOnly,
//! )?;
//!
//! match inventory
//!     .call(|| async { Err::<(), _>(RemoteError::rejected("inventory", "unknown sku")) })
//!     .await
//! {
//!     Err(BreakerError::Inner(e)) => println!("request rejected: {e}"),
//!     Err(BreakerError::Open(e)) => println!("fast-failed: {e}"),
//!     Ok(()) => {}
//! }
//! # Ok(())
//! # }
//! ```

pub mod breaker;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fanout;
pub mod state;

pub use breaker::{BreakerStats, CircuitBreaker};
pub use classifier::{
    AllErrors, FaultClassifier, Outcome, PredicateClassifier, TransientFault, TransientOnly,
};
pub use config::CircuitBreakerConfig;
pub use error::{BreakerError, CircuitOpenError, ConfigError, RemoteError};
pub use fanout::{FanOut, FanOutReport, FanOutResponse};
pub use state::CircuitState;
