//! Integration tests for the worker lifecycle.
//!
//! Covers ordering, failure containment, shutdown with queued events and
//! the shutdown timeout.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use sluice_core::{BoundedQueue, Clock, Event, EventSubmission, TestClock};
use sluice_testing::{FailingProcessor, RecordingProcessor};
use sluice_worker::{spawn_worker, SimulatedProcessor, WorkerError};

fn event(clock: &TestClock, event_type: &str, payload: &str) -> Event {
    EventSubmission { event_type: event_type.into(), payload: payload.to_string() }
        .accept(clock.now_utc())
}

#[tokio::test]
async fn worker_processes_in_admission_order() -> Result<()> {
    let clock = TestClock::new();
    let queue = Arc::new(BoundedQueue::new(16)?);
    let processor = RecordingProcessor::new();

    for i in 0..10 {
        assert!(queue.try_enqueue(event(&clock, "SEQ", &i.to_string())).is_accepted());
        clock.advance(Duration::from_millis(1));
    }

    let worker = spawn_worker(queue.clone(), Arc::new(processor.clone()));
    worker.shutdown(Duration::from_secs(2)).await?;

    let payloads: Vec<String> = processor.seen().into_iter().map(|e| e.payload).collect();
    let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    assert_eq!(payloads, expected);
    Ok(())
}

#[tokio::test]
async fn worker_wakes_for_events_enqueued_after_start() -> Result<()> {
    let clock = TestClock::new();
    let queue = Arc::new(BoundedQueue::new(4)?);
    let processor = RecordingProcessor::new();
    let worker = spawn_worker(queue.clone(), Arc::new(processor.clone()));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(queue.try_enqueue(event(&clock, "LATE", "")).is_accepted());

    tokio::time::timeout(Duration::from_secs(2), async {
        while processor.seen_count() < 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;

    assert!(worker.is_running());
    worker.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

#[tokio::test]
async fn failing_events_are_counted_and_skipped() -> Result<()> {
    let clock = TestClock::new();
    let queue = Arc::new(BoundedQueue::new(8)?);
    let processor = FailingProcessor::new("BAD");

    for event_type in ["GOOD", "BAD", "GOOD", "BAD", "GOOD"] {
        assert!(queue.try_enqueue(event(&clock, event_type, "")).is_accepted());
    }

    let worker = spawn_worker(queue.clone(), Arc::new(processor.clone()));
    let stats = worker.stats_handle();
    worker.shutdown(Duration::from_secs(2)).await?;

    let stats = stats.read().await.clone();
    assert_eq!(stats.events_processed, 3);
    assert_eq!(stats.processing_failures, 2);
    assert_eq!(processor.succeeded().len(), 3);
    Ok(())
}

#[tokio::test]
async fn shutdown_times_out_while_processor_is_stuck() -> Result<()> {
    let clock = TestClock::new();
    let queue = Arc::new(BoundedQueue::new(4)?);
    let processor = RecordingProcessor::gated();
    assert!(queue.try_enqueue(event(&clock, "STUCK", "")).is_accepted());

    let worker = spawn_worker(queue.clone(), Arc::new(processor.clone()));
    let result = worker.shutdown(Duration::from_millis(50)).await;

    assert!(matches!(result, Err(WorkerError::ShutdownTimeout { .. })));
    assert!(queue.is_closed());
    assert_eq!(processor.seen_count(), 0);
    processor.release(1);
    Ok(())
}

#[tokio::test]
async fn simulated_cost_is_charged_per_event() -> Result<()> {
    let clock = TestClock::new();
    let queue = Arc::new(BoundedQueue::new(8)?);
    let processor = SimulatedProcessor::new(Arc::new(clock.clone()), Duration::from_millis(50));

    for _ in 0..4 {
        assert!(queue.try_enqueue(event(&clock, "COST", "")).is_accepted());
    }

    let worker = spawn_worker(queue.clone(), Arc::new(processor));
    let stats = worker.stats_handle();
    worker.shutdown(Duration::from_secs(2)).await?;

    assert_eq!(stats.read().await.events_processed, 4);
    assert_eq!(clock.elapsed(), Duration::from_millis(200));
    Ok(())
}
