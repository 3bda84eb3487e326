//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Request/response tracing
//! 3. Timeout enforcement
//! 4. Body size limit
//! 5. Handler execution
//!
//! The server stops accepting connections on CTRL+C or SIGTERM. Stopping the
//! worker is the caller's job once [`start_server`] returns.

use std::{future::Future, net::SocketAddr, time::Duration};

use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::Response,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::{handlers, AppState};

/// Path events are submitted to.
pub const SUBMIT_PATH: &str = "/system_event";

/// Transport-level limits applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpLimits {
    /// Maximum time a request may take end to end.
    pub request_timeout: Duration,
    /// Largest accepted request body in bytes.
    pub max_payload_bytes: usize,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self { request_timeout: Duration::from_secs(30), max_payload_bytes: 1024 * 1024 }
    }
}

/// Creates the router with default limits.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use sluice_api::{create_router, AppState};
/// use sluice_core::{BoundedQueue, RealClock};
/// use sluice_worker::{spawn_worker, SimulatedProcessor};
///
/// # async fn start() -> Result<(), Box<dyn std::error::Error>> {
/// let queue = Arc::new(BoundedQueue::new(100)?);
/// let processor =
///     SimulatedProcessor::new(Arc::new(RealClock), std::time::Duration::from_millis(50));
/// let worker = spawn_worker(queue.clone(), Arc::new(processor));
///
/// let app = create_router(AppState::new(queue, worker.stats_handle(), Arc::new(RealClock)));
/// // Serve the app...
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    create_router_with_limits(state, HttpLimits::default())
}

/// Creates the router with all routes and middleware.
///
/// The submission route accepts every method so that the submission handler,
/// not the router, decides what an unsupported method means.
pub fn create_router_with_limits(state: AppState, limits: HttpLimits) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check));

    let api_routes = Router::new()
        .route(SUBMIT_PATH, any(handlers::submit_event))
        .layer(DefaultBodyLimit::max(limits.max_payload_bytes));

    Router::new()
        .merge(health_routes)
        .merge(api_routes)
        .layer(TimeoutLayer::new(limits.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Middleware to inject request ID into all responses.
///
/// Adds X-Request-Id header for correlating log lines with responses.
async fn inject_request_id(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let mut req = req;
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Starts the HTTP server and serves until a shutdown signal arrives.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound.
pub async fn start_server(
    state: AppState,
    addr: SocketAddr,
    limits: HttpLimits,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, create_router_with_limits(state, limits), shutdown_signal()).await
}

/// Serves `app` on an already bound listener until `shutdown` completes.
///
/// # Errors
///
/// Returns `std::io::Error` if the listener fails.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let actual_addr = listener.local_addr()?;
    info!("HTTP server listening on {}", actual_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    info!("HTTP server stopped");
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, stopping HTTP server");
        },
        () = terminate => {
            info!("Received SIGTERM, stopping HTTP server");
        },
    }
}
