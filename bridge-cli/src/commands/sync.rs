//! Run a full sync from the command line.

use anyhow::Result;
use std::sync::Arc;

use bridge_core::channels::GroupAllowList;
use bridge_core::client::AuthClient;
use bridge_core::config::Config;
use bridge_core::ops;
use bridge_core::storage::{CourseSyncRecord, SqliteStorage};
use bridge_core::sync::SyncRunner;
use bridge_core::transport::Transport;

/// Run the sync command: one course when given, else every pending course.
pub async fn run(
    config: &Config,
    storage: &SqliteStorage,
    transport: Arc<dyn Transport>,
    course: Option<i64>,
) -> Result<()> {
    let client = AuthClient::connect(&config.chat, transport).await;
    let allow_list = GroupAllowList::parse(&config.sync.group_regex);

    if let Some(course_id) = course {
        let message = ops::manually_trigger_sync(&client, storage, allow_list, course_id).await?;
        println!("{}", message);
        return Ok(());
    }

    let mut runner = SyncRunner::new(&client, storage, allow_list);
    let records = runner.sync_pending_courses().await?;

    if records.is_empty() {
        println!("No pending courses.");
        return Ok(());
    }

    for record in &records {
        report(record);
    }

    Ok(())
}

fn report(record: &CourseSyncRecord) {
    match &record.last_error {
        None => println!("course {}: synced", record.course_id),
        Some(error) => {
            println!("course {}: synced with errors", record.course_id);
            for line in error.lines() {
                println!("  {}", line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::config::{ChatConfig, Protocol};
    use bridge_core::storage::SyncStore;
    use bridge_core::transport::MockTransport;

    fn config() -> Config {
        Config {
            chat: ChatConfig {
                host: "chat.example.org".to_string(),
                port: None,
                protocol: Protocol::Https,
                username: "admin".to_string(),
                password: "secret".to_string(),
            },
            sync: Default::default(),
            task: Default::default(),
            storage: Default::default(),
        }
    }

    #[tokio::test]
    async fn sync_without_pending_courses_is_ok() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        let transport = MockTransport::new();
        transport.queue_failure("connection refused");

        run(&config(), &storage, Arc::new(transport), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn sync_single_course_records_outcome() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        let transport = MockTransport::new();
        // Login fails, so the run records an auth_failure for the course.
        transport.queue_failure("connection refused");

        run(&config(), &storage, Arc::new(transport), Some(7))
            .await
            .unwrap();

        let record = storage.course_sync(7).await.unwrap().unwrap();
        assert!(!record.pending_sync);
        assert!(record.last_error.unwrap().starts_with("[auth_failure]"));
    }
}
