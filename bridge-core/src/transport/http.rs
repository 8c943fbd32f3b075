//! reqwest-backed transport.

use super::{Method, Transport, TransportError};
use async_trait::async_trait;
use serde_json::Value;

/// Transport that talks to a real chat backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for the given base URL, e.g.
    /// `https://chat.example.org:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// The base URL this transport sends requests to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        headers: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Value, TransportError> {
        let url = format!("{}{}", self.base_url, path);

        let mut builder = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };

        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = body {
            builder = builder.json(&body);
        }

        // Failures are reported inside the JSON body, so the HTTP status is
        // intentionally not checked here.
        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        let text = response
            .text()
            .await
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        Ok(serde_json::from_str(&text)?)
    }
}
