//! Processors that let tests observe and control the worker.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use sluice_core::Event;
use sluice_worker::{EventProcessor, Result, WorkerError};
use tokio::sync::Semaphore;

/// Records every event the worker hands it, in processing order.
///
/// A gated recorder holds each event until [`release`](Self::release) grants
/// it a permit, so tests can keep the worker busy while they fill the queue.
#[derive(Debug, Clone, Default)]
pub struct RecordingProcessor {
    seen: Arc<Mutex<Vec<Event>>>,
    gate: Option<Arc<Semaphore>>,
}

impl RecordingProcessor {
    /// Creates a recorder that processes immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recorder that blocks each event until released.
    pub fn gated() -> Self {
        Self { seen: Arc::default(), gate: Some(Arc::new(Semaphore::new(0))) }
    }

    /// Lets `count` more events through the gate. No-op when ungated.
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    /// Returns the events recorded so far.
    pub fn seen(&self) -> Vec<Event> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the number of events recorded so far.
    pub fn seen_count(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl EventProcessor for RecordingProcessor {
    async fn process(&self, event: &Event) -> Result<()> {
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.map_err(|_| {
                WorkerError::processing(event.event_type.as_str(), "processing gate closed")
            })?;
            permit.forget();
        }

        self.seen.lock().unwrap_or_else(PoisonError::into_inner).push(event.clone());
        Ok(())
    }
}

/// Fails every event whose type matches, and accepts the rest.
#[derive(Debug, Clone)]
pub struct FailingProcessor {
    failing_type: String,
    inner: RecordingProcessor,
}

impl FailingProcessor {
    /// Creates a processor failing events of `failing_type`.
    pub fn new(failing_type: impl Into<String>) -> Self {
        Self { failing_type: failing_type.into(), inner: RecordingProcessor::new() }
    }

    /// Returns the events that were processed successfully.
    pub fn succeeded(&self) -> Vec<Event> {
        self.inner.seen()
    }
}

#[async_trait]
impl EventProcessor for FailingProcessor {
    async fn process(&self, event: &Event) -> Result<()> {
        if event.event_type.as_str() == self.failing_type {
            return Err(WorkerError::processing(event.event_type.as_str(), "simulated failure"));
        }
        self.inner.process(event).await
    }
}
