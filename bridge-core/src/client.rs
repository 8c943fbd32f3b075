//! Authenticated client for the chat backend.
//!
//! Mirrors the backend's session model: one login call per client instance,
//! with the session token and user id held in memory for the lifetime of a
//! sync run. Sessions are never persisted.
//!
//! Login follows a soft-failure contract: any failure (error payload,
//! malformed response, transport failure) leaves the client unauthenticated
//! without raising, and callers must check [`AuthClient::authenticated`]
//! before doing authenticated work.

use crate::api::{self, LoginResponse};
use crate::config::ChatConfig;
use crate::error::Result;
use crate::transport::{Method, Transport, TransportError};
use serde_json::{json, Value};
use std::sync::Arc;

/// In-memory session state for one client instance.
#[derive(Debug, Default, Clone)]
struct Session {
    auth_token: String,
    user_id: String,
}

/// Client holding connection settings and session state for the chat API.
pub struct AuthClient {
    url: String,
    username: String,
    password: String,
    transport: Arc<dyn Transport>,
    session: Session,
    authenticated: bool,
}

impl AuthClient {
    /// Create a client without logging in.
    pub fn new(chat: &ChatConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            url: chat.instance_url(),
            username: chat.username.clone(),
            password: chat.password.clone(),
            transport,
            session: Session::default(),
            authenticated: false,
        }
    }

    /// Create a client and log in with the configured credentials.
    ///
    /// A failed login is not an error; the returned client is simply not
    /// authenticated.
    pub async fn connect(chat: &ChatConfig, transport: Arc<dyn Transport>) -> Self {
        let mut client = Self::new(chat, transport);
        let username = client.username.clone();
        let password = client.password.clone();

        if let Err(e) = client.authenticate(&username, &password).await {
            tracing::warn!("chat login failed: {}", e);
        }

        client
    }

    /// Log in with explicit credentials and store the session on success.
    ///
    /// Returns the decoded login response so callers (account linking) can
    /// inspect the backend's error message. A response whose status is not
    /// `"success"` is returned as `Ok` but leaves the client unauthenticated.
    pub async fn authenticate(&mut self, user: &str, password: &str) -> Result<LoginResponse> {
        let body = json!({ "user": user, "password": password });
        let headers = vec![Self::content_type_header()];

        let value = self
            .transport
            .request(Method::Post, api::paths::LOGIN, &headers, Some(body))
            .await?;

        let response: LoginResponse = serde_json::from_value(value)?;

        if response.status == "success" {
            if let Some(data) = &response.data {
                self.store_credentials(data.auth_token.as_deref(), data.user_id.as_deref());
            }
            self.authenticated = true;
        }

        Ok(response)
    }

    // A success payload without both fields leaves the session empty
    // rather than failing the login.
    fn store_credentials(&mut self, auth_token: Option<&str>, user_id: Option<&str>) {
        if let (Some(token), Some(id)) = (auth_token, user_id) {
            self.session.auth_token = token.to_string();
            self.session.user_id = id.to_string();
        }
    }

    /// Whether the last login attempt succeeded.
    pub fn authenticated(&self) -> bool {
        self.authenticated
    }

    /// Base URL of the chat backend instance.
    pub fn instance_url(&self) -> &str {
        &self.url
    }

    /// Session headers for authenticated calls.
    pub fn authentication_headers(&self) -> Vec<(String, String)> {
        vec![
            ("X-Auth-Token".to_string(), self.session.auth_token.clone()),
            ("X-User-Id".to_string(), self.session.user_id.clone()),
        ]
    }

    /// The JSON content type header.
    pub fn content_type_header() -> (String, String) {
        ("Content-Type".to_string(), "application/json".to_string())
    }

    /// Issue an authenticated GET and return the decoded body.
    pub async fn get(&self, path: &str) -> std::result::Result<Value, TransportError> {
        let headers = self.authentication_headers();
        self.transport.request(Method::Get, path, &headers, None).await
    }

    /// Issue an authenticated JSON POST and return the decoded body.
    pub async fn post(&self, path: &str, body: Value) -> std::result::Result<Value, TransportError> {
        let mut headers = self.authentication_headers();
        headers.push(Self::content_type_header());
        self.transport
            .request(Method::Post, path, &headers, Some(body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;
    use crate::transport::MockTransport;
    use serde_json::json;

    fn chat_config() -> ChatConfig {
        ChatConfig {
            host: "chat.example.org".to_string(),
            port: None,
            protocol: Protocol::Https,
            username: "admin".to_string(),
            password: "secret".to_string(),
        }
    }

    fn login_success() -> Value {
        json!({
            "status": "success",
            "data": {"authToken": "tok-1", "userId": "uid-1"}
        })
    }

    #[tokio::test]
    async fn connect_logs_in_with_configured_credentials() {
        let transport = MockTransport::new();
        transport.queue_response(login_success());

        let client = AuthClient::connect(&chat_config(), Arc::new(transport.clone())).await;

        assert!(client.authenticated());
        let login = transport.last_request().unwrap();
        assert_eq!(login.path, "/api/v1/login");
        assert_eq!(login.body, Some(json!({"user": "admin", "password": "secret"})));
        assert!(login
            .headers
            .contains(&("Content-Type".to_string(), "application/json".to_string())));
    }

    #[tokio::test]
    async fn successful_login_stores_session_headers() {
        let transport = MockTransport::new();
        transport.queue_response(login_success());

        let client = AuthClient::connect(&chat_config(), Arc::new(transport)).await;

        let headers = client.authentication_headers();
        assert!(headers.contains(&("X-Auth-Token".to_string(), "tok-1".to_string())));
        assert!(headers.contains(&("X-User-Id".to_string(), "uid-1".to_string())));
    }

    #[tokio::test]
    async fn error_status_leaves_client_unauthenticated() {
        let transport = MockTransport::new();
        transport.queue_response(json!({"status": "error", "error": "Unauthorized"}));

        let client = AuthClient::connect(&chat_config(), Arc::new(transport)).await;

        assert!(!client.authenticated());
    }

    #[tokio::test]
    async fn transport_failure_leaves_client_unauthenticated() {
        let transport = MockTransport::new();
        transport.queue_failure("connection refused");

        let client = AuthClient::connect(&chat_config(), Arc::new(transport)).await;

        assert!(!client.authenticated());
    }

    #[tokio::test]
    async fn success_without_session_fields_stores_nothing() {
        let transport = MockTransport::new();
        transport.queue_response(json!({"status": "success", "data": {}}));

        let client = AuthClient::connect(&chat_config(), Arc::new(transport)).await;

        // The status flag is honored, but no credentials were stored.
        assert!(client.authenticated());
        let headers = client.authentication_headers();
        assert!(headers.contains(&("X-Auth-Token".to_string(), String::new())));
    }

    #[tokio::test]
    async fn authenticate_returns_backend_error_payload() {
        let transport = MockTransport::new();
        transport.queue_failure("ignored"); // connect's login
        transport.queue_response(json!({"status": "error", "error": "Unauthorized"}));

        let mut client = AuthClient::connect(&chat_config(), Arc::new(transport)).await;
        let response = client.authenticate("jane", "wrong").await.unwrap();

        assert_eq!(response.status, "error");
        assert_eq!(response.error.as_deref(), Some("Unauthorized"));
        assert!(!client.authenticated());
    }

    #[tokio::test]
    async fn post_sends_auth_and_content_type_headers() {
        let transport = MockTransport::new();
        transport.queue_response(login_success());
        transport.queue_response(json!({"success": true}));

        let client = AuthClient::connect(&chat_config(), Arc::new(transport.clone())).await;
        client.post("/api/v1/channels.create", json!({"name": "x"})).await.unwrap();

        let request = transport.last_request().unwrap();
        assert!(request
            .headers
            .contains(&("X-Auth-Token".to_string(), "tok-1".to_string())));
        assert!(request
            .headers
            .contains(&("Content-Type".to_string(), "application/json".to_string())));
    }

    #[test]
    fn instance_url_comes_from_config() {
        let transport = MockTransport::new();
        let client = AuthClient::new(&chat_config(), Arc::new(transport));
        assert_eq!(client.instance_url(), "https://chat.example.org");
    }
}
