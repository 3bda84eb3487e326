//! In-process HTTP helpers built on `tower::ServiceExt::oneshot`.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderMap, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use serde_json::Value;
use tower::ServiceExt;

use crate::TestEnv;

/// Buffered response from a router call.
#[derive(Debug)]
pub struct TestResponse {
    /// Response status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Full response body
    pub body: Bytes,
}

impl TestResponse {
    /// Parses the body as JSON.
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body).context("response body is not valid JSON")
    }

    /// Returns `error.code` from an error body.
    pub fn error_code(&self) -> Result<String> {
        let body = self.json()?;
        body["error"]["code"]
            .as_str()
            .map(str::to_string)
            .context("response body has no error.code")
    }
}

/// Sends one request through `router` and buffers the response.
pub async fn send(
    router: Router,
    method: Method,
    uri: &str,
    body: impl Into<Body>,
) -> Result<TestResponse> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(body.into())
        .context("failed to build request")?;

    let response = router.oneshot(request).await.context("router call failed")?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .context("failed to read response body")?;

    Ok(TestResponse { status, headers, body })
}

/// Builds a submission body for `event_type` and `payload`.
pub fn event_body(event_type: &str, payload: &str) -> String {
    serde_json::json!({ "type": event_type, "payload": payload }).to_string()
}

impl TestEnv {
    /// Sends `method` to `uri` on a fresh router.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: impl Into<Body>,
    ) -> Result<TestResponse> {
        send(self.router(), method, uri, body).await
    }

    /// Posts a raw body to the submission path.
    pub async fn post_raw(&self, body: impl Into<Body>) -> Result<TestResponse> {
        self.send(Method::POST, sluice_api::server::SUBMIT_PATH, body).await
    }

    /// Posts a well-formed event to the submission path.
    pub async fn post_event(&self, event_type: &str, payload: &str) -> Result<TestResponse> {
        self.post_raw(event_body(event_type, payload)).await
    }

    /// Sends a GET to `uri`.
    pub async fn get(&self, uri: &str) -> Result<TestResponse> {
        self.send(Method::GET, uri, Body::empty()).await
    }
}
