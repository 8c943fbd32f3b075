//! Verify a user's own chat credentials.
//!
//! Only available when the administrator allows end users to connect their
//! own accounts through the bridge. The credentials are checked against the
//! backend and immediately discarded; nothing is stored.

use anyhow::{bail, Result};
use std::sync::Arc;

use bridge_core::client::AuthClient;
use bridge_core::config::Config;
use bridge_core::transport::Transport;

/// Run the link-account command.
pub async fn run(
    config: &Config,
    transport: Arc<dyn Transport>,
    username: &str,
    password: Option<&str>,
) -> Result<()> {
    if !config.sync.allow_external_connection {
        bail!("Account linking is disabled. Set sync.allow_external_connection = true to enable it.");
    }

    let password = match password {
        Some(p) => p.to_string(),
        None => rpassword::prompt_password("Chat password: ")?,
    };

    let mut client = AuthClient::new(&config.chat, transport);
    let response = client.authenticate(username, &password).await?;

    if client.authenticated() {
        println!("Credentials verified for {}.", username);
    } else {
        let reason = response
            .error
            .or(response.message)
            .unwrap_or_else(|| "invalid credentials".to_string());
        bail!("Login failed: {}", reason);
    }

    Ok(())
}
