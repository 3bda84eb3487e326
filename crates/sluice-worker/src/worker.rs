//! Single-consumer worker loop and its task handle.
//!
//! The worker owns the consumer side of the admission queue. It runs until
//! the queue is closed and drained; nothing else stops it. Processing
//! failures and panics are contained per event.

use std::{sync::Arc, time::Duration};

use sluice_core::{BoundedQueue, Event};
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{error, info, warn};

use crate::{
    error::{Result, WorkerError},
    processor::EventProcessor,
};

/// Configuration for the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Nominal cost of processing one event.
    pub processing_cost: Duration,

    /// Maximum time to wait for the worker to exit once the queue closes.
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            processing_cost: Duration::from_millis(crate::DEFAULT_PROCESSING_COST_MS),
            shutdown_timeout: Duration::from_secs(crate::DEFAULT_SHUTDOWN_TIMEOUT_SECONDS),
        }
    }
}

/// Counters describing the worker's progress.
///
/// Written only by the worker task; everyone else reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Whether the worker loop is currently running.
    pub running: bool,
    /// Events whose processing step completed successfully.
    pub events_processed: u64,
    /// Events whose processing step failed or panicked.
    pub processing_failures: u64,
}

/// The sole consumer of the admission queue.
pub struct EventWorker {
    queue: Arc<BoundedQueue<Event>>,
    processor: Arc<dyn EventProcessor>,
    stats: Arc<RwLock<WorkerStats>>,
}

impl EventWorker {
    /// Creates a worker that drains `queue` through `processor`.
    pub fn new(
        queue: Arc<BoundedQueue<Event>>,
        processor: Arc<dyn EventProcessor>,
        stats: Arc<RwLock<WorkerStats>>,
    ) -> Self {
        Self { queue, processor, stats }
    }

    /// Main loop: dequeues and processes events until the queue is closed
    /// and empty.
    pub async fn run(&self) {
        self.stats.write().await.running = true;
        info!(capacity = self.queue.capacity(), "event worker started");

        while let Some(event) = self.queue.dequeue().await {
            self.process_event(event).await;
        }

        self.stats.write().await.running = false;
        info!("event queue closed and drained, event worker stopping");
    }

    /// Processes one event, containing any failure.
    async fn process_event(&self, event: Event) {
        let event_type = event.event_type.clone();
        info!(
            event_type = %event_type,
            payload = %event.payload,
            received_at = %event.received_at,
            "processing event"
        );

        let processor = self.processor.clone();
        let outcome = tokio::spawn(async move { processor.process(&event).await }).await;

        let result = match outcome {
            Ok(result) => result,
            Err(join_error) => Err(WorkerError::ProcessingPanicked {
                event_type: event_type.to_string(),
                message: join_error.to_string(),
            }),
        };

        let mut stats = self.stats.write().await;
        match result {
            Ok(()) => {
                stats.events_processed += 1;
                info!(event_type = %event_type, "finished processing event");
            },
            Err(error) => {
                stats.processing_failures += 1;
                error!(event_type = %event_type, error = %error, "event processing failed");
            },
        }
    }
}

/// Starts the worker loop on a dedicated tokio task.
pub fn spawn_worker(
    queue: Arc<BoundedQueue<Event>>,
    processor: Arc<dyn EventProcessor>,
) -> WorkerHandle {
    let stats = Arc::new(RwLock::new(WorkerStats { running: true, ..WorkerStats::default() }));
    let worker = EventWorker::new(queue.clone(), processor, stats.clone());

    let handle = tokio::spawn(async move { worker.run().await });

    WorkerHandle { queue, stats, handle: Some(handle) }
}

/// Handle to a running worker task.
pub struct WorkerHandle {
    queue: Arc<BoundedQueue<Event>>,
    stats: Arc<RwLock<WorkerStats>>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Returns a snapshot of the worker counters.
    pub async fn stats(&self) -> WorkerStats {
        self.stats.read().await.clone()
    }

    /// Returns the shared counters, for health reporting.
    pub fn stats_handle(&self) -> Arc<RwLock<WorkerStats>> {
        self.stats.clone()
    }

    /// Returns true while the worker task has not exited.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Closes the queue and waits up to `timeout` for the worker to exit.
    ///
    /// Events still queued when the timeout expires are not processed.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::ShutdownTimeout`] if the worker is still
    /// running after `timeout`, or [`WorkerError::WorkerPanic`] if the task
    /// terminated abnormally.
    pub async fn shutdown(mut self, timeout: Duration) -> Result<()> {
        let pending = self.queue.len();
        info!(
            pending_events = pending,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "closing event queue and stopping worker"
        );
        self.queue.close();

        let Some(handle) = self.handle.take() else { return Ok(()) };

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => {
                info!("event worker stopped");
                Ok(())
            },
            Ok(Err(join_error)) => {
                error!(error = %join_error, "event worker task failed");
                Err(WorkerError::WorkerPanic { message: join_error.to_string() })
            },
            Err(_elapsed) => {
                warn!(
                    remaining_events = self.queue.len(),
                    "event worker did not stop before shutdown timeout"
                );
                Err(WorkerError::ShutdownTimeout { timeout })
            },
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        let Some(handle) = self.handle.as_ref() else { return };

        if !handle.is_finished() && !self.queue.is_closed() {
            warn!(
                "WorkerHandle dropped while the worker is running; closing the queue. \
                 Call shutdown() to wait for the worker to exit."
            );
            self.queue.close();
        }
    }
}
