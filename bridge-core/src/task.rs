//! Background task running full syncs for pending courses.
//!
//! Stands in for the host's cron: every tick it logs in once and syncs
//! every course currently flagged as pending.

use crate::channels::GroupAllowList;
use crate::client::AuthClient;
use crate::config::Config;
use crate::storage::SqliteStorage;
use crate::sync::SyncRunner;
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Spawn the periodic sync task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_sync_task(
    storage: Arc<SqliteStorage>,
    config: Config,
    transport: Arc<dyn Transport>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.task.enabled {
            tracing::info!("Sync task disabled");
            return;
        }

        let interval_secs = config.task.interval_secs;
        tracing::info!("Sync task started (interval: {}s)", interval_secs);

        let allow_list = GroupAllowList::parse(&config.sync.group_regex);
        let mut timer = interval(Duration::from_secs(interval_secs));

        loop {
            timer.tick().await;

            // One fresh login per pass; sessions are never reused across
            // ticks.
            let client = AuthClient::connect(&config.chat, transport.clone()).await;
            let mut runner = SyncRunner::new(&client, storage.as_ref(), allow_list.clone());

            match runner.sync_pending_courses().await {
                Ok(results) if results.is_empty() => {
                    tracing::debug!("Sync pass: no pending courses");
                }
                Ok(results) => {
                    let failed = results.iter().filter(|r| r.last_error.is_some()).count();
                    tracing::info!(
                        "Sync pass: {} courses synced, {} with errors",
                        results.len(),
                        failed
                    );
                }
                Err(e) => {
                    tracing::error!("Sync pass error: {}", e);
                }
            }
        }
    })
}
