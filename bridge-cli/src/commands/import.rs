//! Load a roster snapshot into the local database.
//!
//! The snapshot is a JSON export of the host LMS roster. Importing is
//! idempotent: existing rows are overwritten, membership and role rows are
//! deduplicated.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use bridge_core::storage::{Course, Enrolment, Group, RosterStore, RosterUser, SqliteStorage};

/// A roster export from the host LMS.
#[derive(Debug, Default, Deserialize)]
pub struct RosterSnapshot {
    #[serde(default)]
    courses: Vec<Course>,
    #[serde(default)]
    groups: Vec<Group>,
    #[serde(default)]
    users: Vec<RosterUser>,
    #[serde(default)]
    enrolments: Vec<Enrolment>,
    #[serde(default)]
    memberships: Vec<Membership>,
    #[serde(default)]
    role_assignments: Vec<RoleAssignment>,
}

#[derive(Debug, Deserialize)]
struct Membership {
    group_id: i64,
    user_id: i64,
}

#[derive(Debug, Deserialize)]
struct RoleAssignment {
    course_id: i64,
    user_id: i64,
    role_id: i64,
}

/// Run the import command.
pub async fn run(storage: &SqliteStorage, file: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read snapshot {}", file.display()))?;

    let snapshot: RosterSnapshot =
        serde_json::from_str(&content).context("Failed to parse snapshot")?;

    apply(storage, &snapshot).await?;

    println!("Imported roster snapshot:");
    println!("  Courses:          {}", snapshot.courses.len());
    println!("  Groups:           {}", snapshot.groups.len());
    println!("  Users:            {}", snapshot.users.len());
    println!("  Enrolments:       {}", snapshot.enrolments.len());
    println!("  Memberships:      {}", snapshot.memberships.len());
    println!("  Role assignments: {}", snapshot.role_assignments.len());

    Ok(())
}

async fn apply(storage: &SqliteStorage, snapshot: &RosterSnapshot) -> Result<()> {
    for course in &snapshot.courses {
        storage.upsert_course(course).await?;
    }
    for group in &snapshot.groups {
        storage.upsert_group(group).await?;
    }
    for user in &snapshot.users {
        storage.upsert_user(user).await?;
    }
    for enrolment in &snapshot.enrolments {
        storage.upsert_enrolment(enrolment).await?;
    }
    for membership in &snapshot.memberships {
        storage
            .add_group_member(membership.group_id, membership.user_id)
            .await?;
    }
    for assignment in &snapshot.role_assignments {
        storage
            .add_role_assignment(assignment.course_id, assignment.user_id, assignment.role_id)
            .await?;
    }
    Ok(())
}
