//! Health check handlers for service monitoring.
//!
//! Reports admission queue occupancy and worker state. The service is
//! unhealthy once the queue stops admitting events or the worker has
//! stopped draining it.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sluice_core::{BoundedQueue, Clock, Event};
use sluice_worker::WorkerStats;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::AppState;

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service health status
    pub status: HealthStatus,
    /// Timestamp when health check was performed
    pub timestamp: DateTime<Utc>,
    /// Individual component health checks
    pub checks: HealthChecks,
    /// Service version information
    pub version: String,
}

/// Overall health status enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Accepting and processing events
    Healthy,
    /// Running, but the queue is currently full
    Degraded,
    /// Not accepting or not processing events
    Unhealthy,
}

/// Individual component health check results.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Admission queue state
    pub queue: QueueHealth,
    /// Worker state
    pub worker: WorkerHealth,
}

/// Component-level health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is working
    Up,
    /// Component has stopped
    Down,
}

/// Admission queue health.
#[derive(Debug, Serialize)]
pub struct QueueHealth {
    /// Whether the queue still admits events
    pub status: ComponentStatus,
    /// Events currently waiting
    pub depth: usize,
    /// Fixed capacity
    pub capacity: usize,
}

/// Worker health.
#[derive(Debug, Serialize)]
pub struct WorkerHealth {
    /// Whether the worker loop is running
    pub status: ComponentStatus,
    /// Events processed successfully
    pub events_processed: u64,
    /// Events whose processing failed
    pub processing_failures: u64,
}

/// Health service that encapsulates the clock dependency for testable
/// health checks.
pub struct HealthService {
    clock: Arc<dyn Clock>,
}

impl HealthService {
    /// Creates a new health service with the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Inspects the queue and worker.
    pub async fn health_check(
        &self,
        queue: &BoundedQueue<Event>,
        worker_stats: &RwLock<WorkerStats>,
    ) -> HealthResponse {
        debug!("Performing health check");

        let depth = queue.len();
        let capacity = queue.capacity();
        let queue_status =
            if queue.is_closed() { ComponentStatus::Down } else { ComponentStatus::Up };

        let stats = worker_stats.read().await.clone();
        let worker_status = if stats.running { ComponentStatus::Up } else { ComponentStatus::Down };

        let status = match (queue_status, worker_status) {
            (ComponentStatus::Up, ComponentStatus::Up) if depth >= capacity => {
                HealthStatus::Degraded
            },
            (ComponentStatus::Up, ComponentStatus::Up) => HealthStatus::Healthy,
            _ => HealthStatus::Unhealthy,
        };

        HealthResponse {
            status,
            timestamp: self.clock.now_utc(),
            checks: HealthChecks {
                queue: QueueHealth { status: queue_status, depth, capacity },
                worker: WorkerHealth {
                    status: worker_status,
                    events_processed: stats.events_processed,
                    processing_failures: stats.processing_failures,
                },
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Health check endpoint handler.
///
/// Returns 200 while events can be admitted and processed (including when
/// the queue is momentarily full) and 503 otherwise.
#[instrument(name = "health_check", skip(app_state))]
pub async fn health_check(State(app_state): State<AppState>) -> Response {
    let health_service = HealthService::new(app_state.clock.clone());
    let response = health_service.health_check(&app_state.queue, &app_state.worker_stats).await;

    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    debug!(
        status = ?response.status,
        queue_depth = response.checks.queue.depth,
        "Health check completed"
    );

    (status_code, Json(response)).into_response()
}

/// Readiness check endpoint for orchestrators.
///
/// Same checks as the health endpoint: a closed queue or a stopped worker
/// means the service should not receive traffic.
#[instrument(name = "readiness_check", skip(app_state))]
pub async fn readiness_check(State(app_state): State<AppState>) -> Response {
    health_check(State(app_state)).await
}

/// Liveness check endpoint.
///
/// Only tells whether the HTTP server is responding.
#[instrument(name = "liveness_check", skip(app_state))]
pub async fn liveness_check(State(app_state): State<AppState>) -> Response {
    let response = serde_json::json!({
        "status": "alive",
        "timestamp": app_state.clock.now_utc(),
        "service": "sluice-api"
    });

    (StatusCode::OK, Json(response)).into_response()
}
