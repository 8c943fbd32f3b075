//! Mock transport for testing.
//!
//! Allows queueing JSON responses and capturing issued requests for
//! verification.

use super::{Method, Transport, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One request captured by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: Method,
    /// Request path including any query string.
    pub path: String,
    /// Headers sent with the request.
    pub headers: Vec<(String, String)>,
    /// JSON body, when one was sent.
    pub body: Option<Value>,
}

/// Mock transport for testing.
///
/// Responses are served from a FIFO queue; every issued request is recorded.
/// An empty queue fails the call, which stands in for a network failure.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    requests: Vec<RecordedRequest>,
    response_queue: VecDeque<Result<Value, String>>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON body to be returned by the next `request()` call.
    pub fn queue_response(&self, body: Value) {
        let mut inner = self.inner.lock().unwrap();
        inner.response_queue.push_back(Ok(body));
    }

    /// Queue a transport-level failure for the next `request()` call.
    pub fn queue_failure(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.response_queue.push_back(Err(error.to_string()));
    }

    /// Get all requests that were issued.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        let inner = self.inner.lock().unwrap();
        inner.requests.clone()
    }

    /// Get the last request that was issued.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        let inner = self.inner.lock().unwrap();
        inner.requests.last().cloned()
    }

    /// Number of requests issued so far.
    pub fn request_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.requests.len()
    }

    /// Clear all state (recorded requests and queued responses).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        headers: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Value, TransportError> {
        let mut inner = self.inner.lock().unwrap();

        inner.requests.push(RecordedRequest {
            method,
            path: path.to_string(),
            headers: headers.to_vec(),
            body,
        });

        match inner.response_queue.pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(error)) => Err(TransportError::RequestFailed(error)),
            None => Err(TransportError::RequestFailed(
                "no scripted response".to_string(),
            )),
        }
    }
}
