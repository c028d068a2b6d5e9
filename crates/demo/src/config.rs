//! Demo configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Where the demo injects a failure into the fulfillment saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    CreateOrder,
    ReserveInventory,
    ChargePayment,
    /// Charge fails and releasing the reservation fails too.
    ReleaseInventory,
}

impl FromStr for FailPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "create_order" => Ok(FailPoint::CreateOrder),
            "reserve_inventory" => Ok(FailPoint::ReserveInventory),
            "charge_payment" => Ok(FailPoint::ChargePayment),
            "release_inventory" => Ok(FailPoint::ReleaseInventory),
            other => Err(format!("unknown fail step '{other}'")),
        }
    }
}

/// Demo configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DEMO_FAIL_STEP`: `create_order`, `reserve_inventory`, `charge_payment`
///   or `release_inventory` (default: no failure)
/// - `FANOUT_WAIT_MS`: fan-out deadline in milliseconds (default: `200`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub fail_point: Option<FailPoint>,
    pub fanout_wait: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: std::env::var("LOG_FORMAT")
                .ok()
                .and_then(|f| f.parse().ok())
                .unwrap_or(defaults.log_format),
            fail_point: std::env::var("DEMO_FAIL_STEP")
                .ok()
                .and_then(|s| s.parse().ok()),
            fanout_wait: std::env::var("FANOUT_WAIT_MS")
                .ok()
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.fanout_wait),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            fail_point: None,
            fanout_wait: Duration::from_millis(200),
        }
    }
}
