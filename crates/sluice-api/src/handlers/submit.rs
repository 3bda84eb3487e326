//! Event submission handler.
//!
//! Maps [`SubmissionOutcome`] onto HTTP: 200 for queued events, 405 for
//! unsupported methods, 400 for undecodable bodies and 503 when the queue
//! cannot take the event. Retryable refusals carry `Retry-After`.

use axum::{
    extract::State,
    http::{
        header::{ALLOW, RETRY_AFTER},
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use sluice_core::SluiceError;
use tracing::instrument;

use crate::{
    submission::{StatusCategory, SubmissionOutcome},
    AppState,
};

/// Response body for a queued event.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// Always `queued`
    pub status: &'static str,
    /// Type of the queued event
    pub event_type: String,
    /// Confirmation message
    pub message: String,
}

/// Error response with code and message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details including code and message
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code from the taxonomy (E1001-E3003)
    pub code: String,
    /// Human-readable error description
    pub message: String,
}

/// Submits one event for background processing.
///
/// # Errors
///
/// Returns appropriate HTTP status codes:
/// - 405: Method other than POST
/// - 400: Body is not a valid event
/// - 503: Queue is full or closed; retry later
#[instrument(name = "submit_event", skip(state, body), fields(method = %method, body_bytes = body.len()))]
pub async fn submit_event(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    state.submissions.submit(&method, &body).into_response()
}

impl StatusCategory {
    /// Returns the HTTP status code for this category.
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadPayload => StatusCode::BAD_REQUEST,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for SubmissionOutcome {
    fn into_response(self) -> Response {
        let status = self.category().status_code();
        let message = self.message();

        match self {
            Self::Accepted { event_type } => (
                status,
                Json(SubmitResponse { status: "queued", event_type: event_type.to_string(), message }),
            )
                .into_response(),
            Self::Refused(error) => create_error_response(status, &error, message),
        }
    }
}

/// Seconds a refused caller should wait before resubmitting.
const RETRY_AFTER_SECONDS: &str = "1";

/// Creates a standardized error response.
fn create_error_response(status: StatusCode, error: &SluiceError, message: String) -> Response {
    let body = ErrorResponse { error: ErrorDetail { code: error.code().to_string(), message } };
    let mut response = (status, Json(body)).into_response();

    if matches!(error, SluiceError::MethodNotAllowed { .. }) {
        response.headers_mut().insert(ALLOW, HeaderValue::from_static("POST"));
    }

    if error.is_retryable() {
        response.headers_mut().insert(RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECONDS));
    }

    response
}
