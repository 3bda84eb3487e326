//! HTTP request handlers for the sluice API.
//!
//! Handlers are grouped by functionality:
//! - `submit` - event submission
//! - `health` - health, readiness and liveness checks
//!
//! # Error Handling
//!
//! Refused submissions return a JSON body with:
//! - An error code from the taxonomy (E1001-E3003)
//! - A human-readable message

pub mod health;
pub mod submit;

pub use health::{health_check, liveness_check, readiness_check};
pub use submit::submit_event;
