//! Admission of one submitted event.
//!
//! Turns `(method, raw body)` into an [`Event`], stamps it, and offers it to
//! the bounded queue. Every refusal is resolved here; nothing that fails
//! admission reaches the worker.

use std::sync::{Arc, Mutex, PoisonError};

use axum::http::Method;
use chrono::{DateTime, Utc};
use sluice_core::{
    BoundedQueue, Clock, EnqueueOutcome, Event, EventSubmission, EventType, Rejection,
    SluiceError,
};
use tracing::{info, warn};

/// Caller-facing category of a submission outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    /// The event was queued.
    Success,
    /// The request used an unsupported method.
    MethodNotAllowed,
    /// The body was not a valid event.
    BadPayload,
    /// The queue could not take the event right now.
    ServiceUnavailable,
}

/// Result of one submission attempt.
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// The event was admitted to the queue.
    Accepted {
        /// Type of the admitted event
        event_type: EventType,
    },
    /// The event was not admitted.
    Refused(SluiceError),
}

impl SubmissionOutcome {
    /// Returns the caller-facing category.
    pub fn category(&self) -> StatusCategory {
        match self {
            Self::Accepted { .. } => StatusCategory::Success,
            Self::Refused(SluiceError::MethodNotAllowed { .. }) => StatusCategory::MethodNotAllowed,
            Self::Refused(SluiceError::BadPayload(_)) => StatusCategory::BadPayload,
            // Whatever else refused the event was the queue.
            Self::Refused(_) => StatusCategory::ServiceUnavailable,
        }
    }

    /// Returns the human-readable message for the caller.
    pub fn message(&self) -> String {
        match self {
            Self::Accepted { event_type } => {
                format!("Event '{event_type}' received and queued for processing.")
            },
            Self::Refused(error) => error.to_string(),
        }
    }
}

/// Converts requests into events and admits them to the queue.
pub struct SubmissionHandler {
    queue: Arc<BoundedQueue<Event>>,
    clock: Arc<dyn Clock>,
    /// Last `received_at` handed out; never moves backwards.
    last_stamp: Mutex<Option<DateTime<Utc>>>,
}

impl SubmissionHandler {
    /// Creates a handler producing into `queue`.
    pub fn new(queue: Arc<BoundedQueue<Event>>, clock: Arc<dyn Clock>) -> Self {
        Self { queue, clock, last_stamp: Mutex::new(None) }
    }

    /// Returns the acceptance time for the next admitted event.
    ///
    /// Clamped to the previous stamp so a wall clock stepping backwards
    /// cannot reorder `received_at` against the queue.
    fn next_stamp(&self) -> DateTime<Utc> {
        let mut last = self.last_stamp.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now_utc();
        let stamp = match *last {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }

    /// Handles one submission.
    ///
    /// Never waits on the worker: a full queue is reported immediately as
    /// [`SluiceError::QueueSaturated`].
    pub fn submit(&self, method: &Method, body: &[u8]) -> SubmissionOutcome {
        if *method != Method::POST {
            warn!(method = %method, "rejected system event with unsupported method");
            return SubmissionOutcome::Refused(SluiceError::MethodNotAllowed {
                method: method.to_string(),
            });
        }

        let submission = match EventSubmission::from_json(body) {
            Ok(submission) => submission,
            Err(error) => {
                warn!(error = %error, body_bytes = body.len(), "rejected undecodable system event");
                return SubmissionOutcome::Refused(error);
            },
        };

        let event_type = submission.event_type.clone();
        let payload_bytes = submission.payload.len();

        // Stamping inside the admission lock keeps `received_at` ordered
        // like the queue.
        let outcome = self.queue.try_enqueue_with(|| submission.accept(self.next_stamp()));

        match outcome {
            EnqueueOutcome::Accepted => {
                info!(
                    event_type = %event_type,
                    payload_bytes,
                    queue_depth = self.queue.len(),
                    "received event"
                );
                SubmissionOutcome::Accepted { event_type }
            },
            EnqueueOutcome::Rejected(Rejection::Full) => {
                warn!(
                    event_type = %event_type,
                    capacity = self.queue.capacity(),
                    "event queue full"
                );
                SubmissionOutcome::Refused(SluiceError::QueueSaturated {
                    capacity: self.queue.capacity(),
                })
            },
            EnqueueOutcome::Rejected(Rejection::Closed) => {
                warn!(event_type = %event_type, "event queue closed");
                SubmissionOutcome::Refused(SluiceError::QueueClosed)
            },
        }
    }

    /// Returns the queue this handler produces into.
    pub fn queue(&self) -> &Arc<BoundedQueue<Event>> {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use std::{
        future::Future,
        pin::Pin,
        sync::atomic::{AtomicU64, Ordering},
        time::{Duration, Instant, SystemTime, UNIX_EPOCH},
    };

    use sluice_core::TestClock;

    use super::*;

    fn handler(capacity: usize) -> (SubmissionHandler, TestClock) {
        let clock = TestClock::with_start_time(UNIX_EPOCH + Duration::from_secs(1_700_000_000));
        let queue = Arc::new(BoundedQueue::new(capacity).unwrap());
        (SubmissionHandler::new(queue, Arc::new(clock.clone())), clock)
    }

    const CLICK: &[u8] = br#"{"type":"UI_CLICK","payload":"settings_button_pressed"}"#;

    #[tokio::test]
    async fn accepted_event_is_queued_with_stamp() {
        let (handler, clock) = handler(4);

        let outcome = handler.submit(&Method::POST, CLICK);

        assert_eq!(outcome.category(), StatusCategory::Success);
        assert_eq!(outcome.message(), "Event 'UI_CLICK' received and queued for processing.");
        let event = handler.queue().dequeue().await.expect("event queued");
        assert_eq!(event.event_type.as_str(), "UI_CLICK");
        assert_eq!(event.payload, "settings_button_pressed");
        assert_eq!(event.received_at, clock.now_utc());
    }

    #[test]
    fn non_post_methods_are_refused_without_side_effects() {
        let (handler, _clock) = handler(4);

        for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
            let outcome = handler.submit(&method, CLICK);
            assert_eq!(outcome.category(), StatusCategory::MethodNotAllowed);
        }

        assert!(handler.queue().is_empty());
    }

    #[test]
    fn malformed_body_is_refused_without_side_effects() {
        let (handler, _clock) = handler(4);

        for body in [&b"not json"[..], b"", b"{\"type\":7}", b"[1,2,3]"] {
            let outcome = handler.submit(&Method::POST, body);
            assert_eq!(outcome.category(), StatusCategory::BadPayload);
        }

        assert!(handler.queue().is_empty());
    }

    #[tokio::test]
    async fn missing_type_is_admitted_as_empty() {
        let (handler, _clock) = handler(4);

        let outcome = handler.submit(&Method::POST, br#"{"payload":"x"}"#);

        assert_eq!(outcome.category(), StatusCategory::Success);
        let event = handler.queue().dequeue().await.expect("event queued");
        assert!(event.event_type.is_empty());
        assert_eq!(event.payload, "x");
    }

    #[test]
    fn full_queue_reports_service_unavailable() {
        let (handler, _clock) = handler(1);

        assert_eq!(handler.submit(&Method::POST, CLICK).category(), StatusCategory::Success);
        let outcome = handler.submit(&Method::POST, CLICK);

        assert_eq!(outcome.category(), StatusCategory::ServiceUnavailable);
        assert_eq!(outcome.message(), "Event queue is full, try again later.");
        assert_eq!(handler.queue().len(), 1);
    }

    #[test]
    fn closed_queue_reports_service_unavailable() {
        let (handler, _clock) = handler(4);
        handler.queue().close();

        let outcome = handler.submit(&Method::POST, CLICK);

        assert!(matches!(outcome, SubmissionOutcome::Refused(SluiceError::QueueClosed)));
        assert_eq!(outcome.category(), StatusCategory::ServiceUnavailable);
    }

    /// Wall clock that steps one second back on every read.
    #[derive(Debug)]
    struct SteppingBackClock {
        reads: AtomicU64,
    }

    impl Clock for SteppingBackClock {
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn now_system(&self) -> SystemTime {
            let reads = self.reads.fetch_add(1, Ordering::SeqCst);
            UNIX_EPOCH + Duration::from_secs(1_700_000_000 - reads)
        }

        fn sleep(&self, _duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
            Box::pin(std::future::ready(()))
        }
    }

    #[tokio::test]
    async fn stamps_never_go_backwards_when_wall_clock_steps_back() {
        let queue = Arc::new(BoundedQueue::new(4).unwrap());
        let clock = SteppingBackClock { reads: AtomicU64::new(0) };
        let handler = SubmissionHandler::new(queue, Arc::new(clock));

        for _ in 0..3 {
            assert_eq!(handler.submit(&Method::POST, CLICK).category(), StatusCategory::Success);
        }
        handler.queue().close();

        let mut stamps = Vec::new();
        while let Some(event) = handler.queue().dequeue().await {
            stamps.push(event.received_at);
        }
        assert_eq!(stamps.len(), 3);
        assert!(stamps.windows(2).all(|pair| pair[1] >= pair[0]), "stamps regressed: {stamps:?}");
    }

    #[tokio::test]
    async fn stamps_follow_admission_order() {
        let (handler, clock) = handler(8);

        for _ in 0..5 {
            let _ = handler.submit(&Method::POST, CLICK);
            clock.advance(Duration::from_millis(3));
        }
        handler.queue().close();

        let mut previous = None;
        while let Some(event) = handler.queue().dequeue().await {
            if let Some(previous) = previous {
                assert!(event.received_at > previous);
            }
            previous = Some(event.received_at);
        }
    }
}
