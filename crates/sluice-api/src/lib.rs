//! Sluice HTTP API.
//!
//! Binds the submission path to `/system_event` and exposes health checks.
//! The transport layer only maps outcomes to status codes; admission
//! decisions live in [`submission::SubmissionHandler`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use sluice_core::{BoundedQueue, Clock, Event};
use sluice_worker::WorkerStats;
use tokio::sync::RwLock;

pub mod config;
pub mod handlers;
pub mod server;
pub mod submission;

pub use config::Config;
pub use server::{create_router, create_router_with_limits, start_server, HttpLimits};
pub use submission::{StatusCategory, SubmissionHandler, SubmissionOutcome};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    /// Admission path for new events
    pub submissions: Arc<SubmissionHandler>,
    /// Admission queue, read for health reporting
    pub queue: Arc<BoundedQueue<Event>>,
    /// Worker counters, read for health reporting
    pub worker_stats: Arc<RwLock<WorkerStats>>,
    /// Clock used for timestamps
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Builds the state around an existing queue and worker.
    ///
    /// The same `queue` must be the one the worker drains.
    pub fn new(
        queue: Arc<BoundedQueue<Event>>,
        worker_stats: Arc<RwLock<WorkerStats>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let submissions = Arc::new(SubmissionHandler::new(queue.clone(), clock.clone()));
        Self { submissions, queue, worker_stats, clock }
    }
}
