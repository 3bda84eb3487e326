//! Builder for [`TestEnv`].

use std::{sync::Arc, time::SystemTime};

use anyhow::{Context, Result};
use sluice_core::{BoundedQueue, DEFAULT_QUEUE_CAPACITY};
use sluice_worker::{spawn_worker, WorkerStats};
use tokio::sync::RwLock;

use crate::{RecordingProcessor, TestClock, TestEnv};

/// Builder for configuring a [`TestEnv`].
pub struct TestEnvBuilder {
    capacity: usize,
    start_time: Option<SystemTime>,
    processor: Option<RecordingProcessor>,
    enable_worker: bool,
}

impl Default for TestEnvBuilder {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            start_time: None,
            processor: None,
            enable_worker: true,
        }
    }
}

impl TestEnvBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the queue capacity (default: 100).
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Starts the test clock at a fixed wall-clock time.
    #[must_use]
    pub fn start_time(mut self, start: SystemTime) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Uses `processor` instead of a fresh, ungated recorder.
    #[must_use]
    pub fn processor(mut self, processor: RecordingProcessor) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Leaves the queue without a consumer.
    ///
    /// Accepted events stay queued, which makes saturation deterministic.
    /// Health endpoints report the worker as down.
    #[must_use]
    pub fn without_worker(mut self) -> Self {
        self.enable_worker = false;
        self
    }

    /// Builds the environment and starts the worker if enabled.
    pub async fn build(self) -> Result<TestEnv> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
            )
            .with_test_writer()
            .try_init();

        let clock = match self.start_time {
            Some(start) => TestClock::with_start_time(start),
            None => TestClock::new(),
        };
        let queue = Arc::new(
            BoundedQueue::new(self.capacity).context("failed to create test event queue")?,
        );
        let processor = Arc::new(self.processor.unwrap_or_default());

        let (worker, worker_stats) = if self.enable_worker {
            let worker = spawn_worker(queue.clone(), processor.clone());
            let stats = worker.stats_handle();
            (Some(worker), stats)
        } else {
            (None, Arc::new(RwLock::new(WorkerStats::default())))
        };

        tracing::debug!(
            capacity = self.capacity,
            worker = worker.is_some(),
            "created sluice test environment"
        );

        Ok(TestEnv { clock, queue, processor, worker_stats, worker })
    }
}
