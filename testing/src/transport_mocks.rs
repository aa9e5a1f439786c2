//! In-memory HTTP transport for tests
//!
//! [`MockTransport`] records every [`TransportRequest`] it receives and answers
//! from a scripted queue, so tests can assert both what was sent and how the
//! store reacted.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use api_caller_core::envelope::{ApiErrorResponse, ApiResponse};
use api_caller_core::environment::HttpTransport;
use api_caller_core::transport::TransportRequest;
use futures::future::BoxFuture;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Outcome = Result<ApiResponse, ApiErrorResponse>;

#[derive(Debug, Default)]
struct Inner {
    requests: Vec<TransportRequest>,
    scripted: VecDeque<Outcome>,
    fallback: Option<Outcome>,
}

/// Recording, scripted [`HttpTransport`]
///
/// Responses are taken from the queue in order. Once the queue is empty the
/// fallback is used, which defaults to `200 {"ok": true}`. Clones share the
/// same recording and queue.
///
/// # Example
///
/// ```
/// use api_caller_testing::MockTransport;
/// use api_caller_core::envelope::ApiResponse;
/// use serde_json::json;
///
/// let transport = MockTransport::new();
/// transport.push_ok(ApiResponse::json(json!({"id": 1})));
/// assert_eq!(transport.request_count(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
    delay: Option<Duration>,
}

impl MockTransport {
    /// Transport answering `200 {"ok": true}` to everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport answering `outcome` once the queue is empty
    #[must_use]
    pub fn with_response(self, outcome: Outcome) -> Self {
        self.inner.lock().unwrap().fallback = Some(outcome);
        self
    }

    /// Hold every response for `delay` before resolving
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful response
    pub fn push_ok(&self, response: ApiResponse) {
        self.inner.lock().unwrap().scripted.push_back(Ok(response));
    }

    /// Queue a failure
    pub fn push_err(&self, response: ApiErrorResponse) {
        self.inner.lock().unwrap().scripted.push_back(Err(response));
    }

    /// Every request received so far
    #[must_use]
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Number of requests received so far
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }

    /// Most recent request
    #[must_use]
    pub fn last_request(&self) -> Option<TransportRequest> {
        self.inner.lock().unwrap().requests.last().cloned()
    }

    fn next_outcome(&self, request: TransportRequest) -> Outcome {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(request);
        if let Some(outcome) = inner.scripted.pop_front() {
            return outcome;
        }
        inner
            .fallback
            .clone()
            .unwrap_or_else(|| Ok(ApiResponse::json(json!({"ok": true}))))
    }
}

impl HttpTransport for MockTransport {
    fn send(&self, request: TransportRequest) -> BoxFuture<'static, Outcome> {
        let outcome = self.next_outcome(request);
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome
        })
    }
}
