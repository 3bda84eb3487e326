//! Error types for the worker.
//!
//! Processing failures never leave the worker loop; they exist so
//! processors can report what went wrong and the loop can log it. Only
//! lifecycle errors from [`crate::WorkerHandle::shutdown`] reach a caller.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Errors raised while processing events or stopping the worker.
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    /// The processing step failed for one event.
    #[error("processing failed for event type '{event_type}': {message}")]
    ProcessingFailed {
        /// Type of the event being processed
        event_type: String,
        /// Failure description
        message: String,
    },

    /// The processing step panicked.
    #[error("processing panicked for event type '{event_type}': {message}")]
    ProcessingPanicked {
        /// Type of the event being processed
        event_type: String,
        /// Panic description
        message: String,
    },

    /// The worker task itself terminated abnormally.
    #[error("worker task failed: {message}")]
    WorkerPanic {
        /// Join error description
        message: String,
    },

    /// The worker did not exit within the shutdown timeout.
    #[error("worker did not stop within {timeout:?}")]
    ShutdownTimeout {
        /// Timeout that was exceeded
        timeout: Duration,
    },
}

impl WorkerError {
    /// Creates a processing failure for the given event type.
    pub fn processing(event_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessingFailed { event_type: event_type.into(), message: message.into() }
    }
}
