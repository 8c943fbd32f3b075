//! REST transport abstraction for the chat backend.
//!
//! This module provides a pluggable transport layer that abstracts the
//! underlying HTTP mechanism (reqwest, mock for testing).
//!
//! # Design
//!
//! One trait method sends one request and returns the decoded JSON body.
//! The chat backend reports failures inside the body (`success: false`,
//! `status: "error"`), so responses are decoded regardless of HTTP status;
//! a [`TransportError`] means the call never produced a JSON body at all.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.queue_response(serde_json::json!({"success": true}));
//! let body = transport
//!     .request(Method::Get, "/api/v1/rooms.get", &headers, None)
//!     .await?;
//! ```

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::MockTransport;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// HTTP method for a REST call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET request, no body.
    Get,
    /// POST request with an optional JSON body.
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or no response was received.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The response body was not valid JSON.
    #[error("invalid response body: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

/// Transport trait for issuing REST calls against the chat backend.
///
/// Implementations handle the underlying HTTP mechanism (reqwest, mock).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return the decoded JSON response body.
    ///
    /// `path` is appended to the transport's base URL. `headers` are sent
    /// verbatim; `body` is serialized as JSON when present.
    async fn request(
        &self,
        method: Method,
        path: &str,
        headers: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Value, TransportError>;
}
