//! Core domain types for the sluice ingestion service.
//!
//! Provides the event model, the bounded admission queue shared between the
//! HTTP submission path and the background worker, the error taxonomy
//! reported to callers, and the clock abstraction used to stamp events.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod queue;
pub mod time;

pub use error::{Result, SluiceError};
pub use models::{Event, EventSubmission, EventType};
pub use queue::{BoundedQueue, EnqueueOutcome, Rejection};
pub use time::{Clock, RealClock, TestClock};

/// Queue capacity used when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
