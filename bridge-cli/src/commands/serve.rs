//! Run the periodic sync task in the foreground.

use anyhow::{Context, Result};
use std::sync::Arc;

use bridge_core::config::Config;
use bridge_core::storage::SqliteStorage;
use bridge_core::task::spawn_sync_task;
use bridge_core::transport::HttpTransport;

/// Run the serve command until interrupted.
pub async fn run(config: Config, storage: SqliteStorage) -> Result<()> {
    if !config.task.enabled {
        anyhow::bail!("The periodic task is disabled. Set task.enabled = true to serve.");
    }

    println!(
        "Serving: syncing pending courses every {}s against {}",
        config.task.interval_secs,
        config.chat.instance_url()
    );
    println!("Press Ctrl-C to stop.");

    let transport = Arc::new(HttpTransport::new(config.chat.instance_url()));
    let handle = spawn_sync_task(Arc::new(storage), config, transport);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    handle.abort();
    println!("Stopped.");

    Ok(())
}
