//! Demo error types.

use metrics_exporter_prometheus::BuildError;
use resilience::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to install Prometheus recorder: {0}")]
    Metrics(#[from] BuildError),

    #[error("failed to render saga journal: {0}")]
    Journal(#[from] serde_json::Error),
}
