//! Error taxonomy for event submission.
//!
//! Every variant is resolved at the submission boundary and turned into a
//! caller-facing outcome; none of them reach the worker. Codes let clients
//! tell the conditions apart without parsing messages.

use thiserror::Error;

/// Result type alias using `SluiceError`.
pub type Result<T> = std::result::Result<T, SluiceError>;

/// Errors surfaced to callers of the submission path.
#[derive(Debug, Error)]
pub enum SluiceError {
    /// The request used a method other than POST (E1001).
    #[error("Only POST method is supported for system events.")]
    MethodNotAllowed {
        /// Method the caller used
        method: String,
    },

    /// The request body could not be decoded into an event (E1002).
    #[error("Invalid JSON payload: {0}")]
    BadPayload(#[from] serde_json::Error),

    /// The queue was at capacity when the event arrived (E3001).
    #[error("Event queue is full, try again later.")]
    QueueSaturated {
        /// Capacity of the saturated queue
        capacity: usize,
    },

    /// The queue no longer admits events (E3002).
    #[error("Event queue is closed, try again later.")]
    QueueClosed,

    /// A queue was requested with zero capacity (E3003).
    #[error("queue capacity must be greater than 0")]
    InvalidCapacity,
}

impl SluiceError {
    /// Returns the error code (E1001-E3003).
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed { .. } => "E1001",
            Self::BadPayload(_) => "E1002",
            Self::QueueSaturated { .. } => "E3001",
            Self::QueueClosed => "E3002",
            Self::InvalidCapacity => "E3003",
        }
    }

    /// Returns whether the caller may resubmit the same request later.
    ///
    /// Sluice never retries on the caller's behalf.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::QueueSaturated { .. } | Self::QueueClosed)
    }
}
