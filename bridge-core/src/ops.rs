//! Administrative operations on sync state.
//!
//! Thin validation layer between the outer surfaces (CLI, admin views) and
//! the store: ids are checked before they touch the database, and the
//! trigger operation reports what it did so surfaces can echo it.

use crate::channels::GroupAllowList;
use crate::client::AuthClient;
use crate::error::{BridgeError, Result};
use crate::storage::{CourseOverview, RoleOverview, RosterStore, SyncStore};
use crate::sync::SyncRunner;

fn check_id(kind: &str, id: i64) -> Result<()> {
    if id <= 0 {
        return Err(BridgeError::InvalidParameter {
            reason: format!("{} id must be positive, got {}", kind, id),
        });
    }
    Ok(())
}

/// Flag or unflag a course for the next sync pass.
pub async fn set_course_sync(
    storage: &dyn SyncStore,
    course_id: i64,
    pending: bool,
) -> Result<()> {
    check_id("course", course_id)?;
    storage.set_pending_sync(course_id, pending).await?;
    tracing::info!(course_id, pending, "course sync flag changed");
    Ok(())
}

/// Turn event-based sync on or off for a course.
pub async fn set_event_based_sync(
    storage: &dyn SyncStore,
    course_id: i64,
    enabled: bool,
) -> Result<()> {
    check_id("course", course_id)?;
    storage.set_event_based_sync(course_id, enabled).await?;
    tracing::info!(course_id, enabled, "event-based sync flag changed");
    Ok(())
}

/// Flag or unflag a role: members holding a flagged role are subscribed to
/// their group channels during full syncs.
pub async fn set_role_sync(storage: &dyn SyncStore, role_id: i64, require_sync: bool) -> Result<()> {
    check_id("role", role_id)?;
    storage.set_role_sync(role_id, require_sync).await?;
    tracing::info!(role_id, require_sync, "role sync flag changed");
    Ok(())
}

/// Run a full sync for one course right now, outside the periodic pass.
/// Returns a human-readable outcome line (plus the collected errors, when
/// any).
pub async fn manually_trigger_sync<S>(
    client: &AuthClient,
    storage: &S,
    allow_list: GroupAllowList,
    course_id: i64,
) -> Result<String>
where
    S: SyncStore + RosterStore,
{
    check_id("course", course_id)?;

    let mut runner = SyncRunner::new(client, storage, allow_list);
    let record = runner.sync_course(course_id).await?;

    Ok(match record.last_error {
        None => format!("course {} synced", course_id),
        Some(error) => format!("course {} synced with errors:\n{}", course_id, error),
    })
}

/// Every course with its sync state, for the admin overview.
pub async fn course_overview(storage: &dyn SyncStore) -> Result<Vec<CourseOverview>> {
    Ok(storage.course_overview().await?)
}

/// Every assigned role with its sync flag, for the admin overview.
pub async fn role_overview(storage: &dyn SyncStore) -> Result<Vec<RoleOverview>> {
    Ok(storage.role_overview().await?)
}
