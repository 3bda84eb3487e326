//! Test infrastructure for deterministic sluice testing.
//!
//! Wires a bounded queue, a worker and the HTTP router together around a
//! [`TestClock`], so tests drive the real submission path in-process and
//! observe exactly what the worker saw.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use sluice_api::{create_router, AppState};
use sluice_core::{BoundedQueue, Event};
use sluice_worker::{WorkerHandle, WorkerStats};
use tokio::sync::RwLock;

pub mod http;
pub mod processors;

mod env_core;

pub use env_core::TestEnvBuilder;
pub use http::TestResponse;
pub use processors::{FailingProcessor, RecordingProcessor};
pub use sluice_core::{Clock, TestClock};

/// In-process sluice service for integration tests.
///
/// The queue, the router and the worker share one [`TestClock`]; the worker
/// drains through a [`RecordingProcessor`] unless it was disabled in the
/// builder.
pub struct TestEnv {
    /// Deterministic clock stamping every accepted event
    pub clock: TestClock,
    /// Admission queue shared by the router and the worker
    pub queue: Arc<BoundedQueue<Event>>,
    /// Processor the worker hands events to
    pub processor: Arc<RecordingProcessor>,
    /// Worker counters read by the health endpoints
    worker_stats: Arc<RwLock<WorkerStats>>,
    /// Running worker, if one was started
    worker: Option<WorkerHandle>,
}

impl TestEnv {
    /// Creates an environment with a running worker and default capacity.
    pub async fn new() -> Result<Self> {
        TestEnvBuilder::new().build().await
    }

    /// Returns a builder for customized environments.
    pub fn builder() -> TestEnvBuilder {
        TestEnvBuilder::new()
    }

    /// Returns the shared application state.
    pub fn app_state(&self) -> AppState {
        AppState::new(self.queue.clone(), self.worker_stats.clone(), Arc::new(self.clock.clone()))
    }

    /// Returns a router serving this environment.
    pub fn router(&self) -> Router {
        create_router(self.app_state())
    }

    /// Returns a snapshot of the worker counters.
    pub async fn worker_stats(&self) -> WorkerStats {
        self.worker_stats.read().await.clone()
    }

    /// Returns true if a worker was started for this environment.
    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    /// Waits until the processor has seen `count` events.
    ///
    /// Polls in real time, independent of the test clock.
    pub async fn wait_for_processed(&self, count: usize, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, async {
            while self.processor.seen_count() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .with_context(|| {
            format!(
                "worker processed {} of {count} events within {timeout:?}",
                self.processor.seen_count()
            )
        })
    }

    /// Closes the queue and waits for the worker to exit.
    pub async fn shutdown(mut self, timeout: Duration) -> Result<()> {
        match self.worker.take() {
            Some(worker) => worker.shutdown(timeout).await.context("worker did not stop cleanly"),
            None => {
                self.queue.close();
                Ok(())
            },
        }
    }
}
