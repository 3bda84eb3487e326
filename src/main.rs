//! Sluice event ingestion service.
//!
//! Main entry point for the sluice server. Wires the bounded queue, the
//! background worker and the HTTP endpoint together and coordinates startup
//! and shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use sluice_api::{AppState, Config};
use sluice_core::{BoundedQueue, Clock, RealClock};
use sluice_worker::{spawn_worker, SimulatedProcessor};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    init_tracing(&config.rust_log);

    info!("Starting sluice event ingestion service");

    let addr = config.parse_server_addr()?;
    let worker_config = config.to_worker_config();
    info!(
        server_addr = %addr,
        queue_capacity = config.queue_capacity,
        processing_cost_ms = config.processing_cost_ms,
        "Configuration loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(RealClock::new());
    let queue =
        Arc::new(BoundedQueue::new(config.queue_capacity).context("Failed to create event queue")?);

    let processor = SimulatedProcessor::new(clock.clone(), worker_config.processing_cost);
    let worker = spawn_worker(queue.clone(), Arc::new(processor));
    info!("Event worker started");

    let state = AppState::new(queue, worker.stats_handle(), clock);

    info!(addr = %addr, "Sluice is ready to receive system events");

    // Returns once a shutdown signal has been received and in-flight
    // requests have completed.
    let served = sluice_api::start_server(state, addr, config.to_http_limits()).await;
    if let Err(e) = &served {
        error!(error = %e, "Server failed");
    }

    if let Err(e) = worker.shutdown(worker_config.shutdown_timeout).await {
        error!(error = %e, "Event worker did not stop cleanly");
    }

    served.context("HTTP server failed")?;

    info!("Sluice shutdown complete");
    Ok(())
}

/// Initializes tracing with environment-based configuration.
///
/// `RUST_LOG` wins; otherwise `default_level` plus debug output for the
/// service's own crates.
fn init_tracing(default_level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "{default_level},sluice=debug,sluice_api=debug,sluice_worker=debug,tower_http=debug"
            ))
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
