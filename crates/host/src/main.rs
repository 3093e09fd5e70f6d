//! Remora Host - Main Entry Point

use anyhow::Result;
use remora_host::{telemetry, HostConfig, HostRuntime, LogFormat};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging; only the format is read up front
    let log_format = LogFormat::from_env();
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("remora=info"))?;
    let otel = telemetry::otel_layer()?;

    match log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(otel)
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(otel)
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("Remora host v{} starting...", VERSION);
    if telemetry::endpoint_ignored() {
        warn!("OpenTelemetry endpoint set but feature 'telemetry' not enabled");
    }

    // 2. Configuration, now that invalid values can be reported
    let config = HostConfig::from_env();

    // 3. Wire the host
    let mut runtime = HostRuntime::build(&config)?;
    runtime.start();

    info!(
        channel = %runtime.channel().name(),
        components = runtime.dispatcher().registered_components().len(),
        session_age_minutes = runtime.dispatcher().session_age_limit(),
        "Host ready. Press Ctrl+C to shutdown"
    );

    // 4. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    runtime.shutdown(Duration::from_secs(5)).await;
    telemetry::shutdown();

    info!("Shutdown complete.");
    Ok(())
}
