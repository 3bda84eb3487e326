//! Event model and the wire shape of a submission.
//!
//! Callers supply the type and payload; the acceptance timestamp is always
//! assigned by the service at admission time.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category tag of an event, e.g. `UI_CLICK`.
///
/// Any string is accepted, including the empty string. Sluice does not
/// maintain a registry of known types.
///
/// # Example
///
/// ```
/// use sluice_core::EventType;
/// let event_type = EventType::from("UI_CLICK");
/// assert_eq!(event_type.as_str(), "UI_CLICK");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(String);

impl EventType {
    /// Creates an event type from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the caller sent an empty tag.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Decoded request body of a submission.
///
/// Both fields default to the empty string when omitted. Unknown fields,
/// including any caller-side timestamp, are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSubmission {
    /// Category tag supplied by the caller
    #[serde(rename = "type", default)]
    pub event_type: EventType,
    /// Opaque event data
    #[serde(default)]
    pub payload: String,
}

impl EventSubmission {
    /// Decodes a submission from a raw JSON body.
    pub fn from_json(body: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Stamps the submission with its acceptance time.
    pub fn accept(self, received_at: DateTime<Utc>) -> Event {
        Event { event_type: self.event_type, payload: self.payload, received_at }
    }
}

/// Unit of work flowing from the submission path to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Category tag supplied by the caller
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Opaque event data
    pub payload: String,
    /// When the service admitted the event
    pub received_at: DateTime<Utc>,
}
