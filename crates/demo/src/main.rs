//! Demo entry point.

use demo::scenario::{self, Services};
use demo::{Config, DemoError, LogFormat};
use saga::{FulfillmentBreakers, SagaOptions, SagaOrchestrator};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    let config = Config::from_env();

    // 1. Initialize tracing
    let json = config.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 3. Build breakers, orchestrator and services
    let breakers = FulfillmentBreakers::from_env()?;
    let orchestrator = SagaOrchestrator::with_options(SagaOptions::from_env()?);
    let services = Services::new();
    if let Some(fail_point) = config.fail_point {
        tracing::info!(?fail_point, "injecting failure");
        services.inject(fail_point);
    }

    // 4. Run the fulfillment saga
    let result = scenario::run_fulfillment(&orchestrator, &services, &breakers).await;
    println!("saga {} finished: {}", result.saga_id, result.status);
    if let Some(cause) = &result.cause {
        println!("  cause: {cause}");
    }
    for compensated in result.compensated_steps() {
        println!("  compensated: {compensated}");
    }
    for error in &result.compensation_errors {
        println!("  NOT compensated: {error}");
    }
    println!("{}", serde_json::to_string_pretty(&result.journal)?);

    // 5. Fan out to the order-page dependencies
    let report = scenario::run_fanout(config.fanout_wait).await?;
    for (dependency, value) in report.successes() {
        println!("fan-out {dependency}: {value}");
    }
    for (dependency, error) in report.failures() {
        println!("fan-out {dependency} failed: {error}");
    }
    for dependency in &report.timed_out {
        println!("fan-out {dependency} timed out");
    }
    for dependency in &report.panicked {
        println!("fan-out {dependency} panicked");
    }

    // 6. Dump metrics
    println!("{}", metrics_handle.render());

    Ok(())
}
