//! Show per-course sync state and role flags.

use anyhow::Result;

use bridge_core::ops;
use bridge_core::storage::SqliteStorage;

/// Run the status command.
pub async fn run(storage: &SqliteStorage) -> Result<()> {
    println!("=== roster-bridge status ===");
    println!();

    let courses = ops::course_overview(storage).await?;
    if courses.is_empty() {
        println!("Courses: none imported yet");
        println!();
        println!("Run 'roster-bridge import <file>' to load a roster snapshot.");
        return Ok(());
    }

    println!("Courses:");
    for course in &courses {
        let pending = if course.pending_sync { "pending" } else { "idle" };
        let events = if course.event_based_sync { "on" } else { "off" };
        let last = course
            .last_sync
            .map(format_timestamp)
            .unwrap_or_else(|| "never".to_string());

        println!(
            "  [{}] {} ({}, events {}, last sync {})",
            course.course_id, course.short_name, pending, events, last
        );
        if let Some(error) = &course.last_error {
            for line in error.lines() {
                println!("      ! {}", line);
            }
        }
    }

    println!();

    let roles = ops::role_overview(storage).await?;
    if roles.is_empty() {
        println!("Roles: no role assignments imported");
    } else {
        println!("Roles:");
        for role in &roles {
            let flag = if role.require_sync { "synced" } else { "ignored" };
            println!("  [{}] {}", role.role_id, flag);
        }
    }

    Ok(())
}

/// Format a Unix timestamp as a human-readable string.
fn format_timestamp(ts: i64) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let diff = now.saturating_sub(ts);

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::storage::{Course, RosterStore, SyncStore};

    #[tokio::test]
    async fn status_on_empty_database() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        run(&storage).await.unwrap();
    }

    #[tokio::test]
    async fn status_with_courses_and_roles() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        storage
            .upsert_course(&Course {
                id: 1,
                short_name: "CS101".to_string(),
                full_name: String::new(),
            })
            .await
            .unwrap();
        storage.set_pending_sync(1, true).await.unwrap();
        storage.add_role_assignment(1, 1, 5).await.unwrap();
        storage.set_role_sync(5, true).await.unwrap();

        run(&storage).await.unwrap();
    }

    #[test]
    fn format_timestamp_works() {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;

        assert_eq!(format_timestamp(now), "just now");
        assert!(format_timestamp(now - 120).contains("minutes"));
        assert!(format_timestamp(now - 7200).contains("hours"));
        assert!(format_timestamp(now - 172800).contains("days"));
    }
}
