//! Storage for roster-bridge.
//!
//! Two concerns share one SQLite database:
//! - sync state owned by the bridge (`course_sync`, `role_sync`)
//! - a local replica of the host LMS roster (courses, groups, members,
//!   users, enrolments, role assignments), fed through the upsert methods
//!
//! Both are expressed as traits so the sync pipeline can run against an
//! in-memory database in tests.

mod sqlite;

pub use sqlite::SqliteStorage;

use crate::error::StorageResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix timestamp, stamped into `last_sync`.
pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Per-course sync state, one row per course, created lazily on first sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSyncRecord {
    /// Row id.
    pub id: i64,
    /// The course this row tracks.
    pub course_id: i64,
    /// Whether the course is due for the next sync pass.
    pub pending_sync: bool,
    /// Whether membership events trigger incremental updates.
    pub event_based_sync: bool,
    /// Unix timestamp of the last completed sync attempt.
    pub last_sync: Option<i64>,
    /// Aggregated error string of the last failed attempt.
    pub last_error: Option<String>,
}

/// Per-role sync flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSyncRecord {
    /// Row id.
    pub id: i64,
    /// The role this row flags.
    pub role_id: i64,
    /// Whether members holding this role are subscribed to channels.
    pub require_sync: bool,
}

/// A course from the host LMS roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Host-side course id.
    pub id: i64,
    /// Short name used to derive channel names.
    pub short_name: String,
    /// Display name.
    #[serde(default)]
    pub full_name: String,
}

/// A named group inside a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Host-side group id.
    pub id: i64,
    /// Course the group belongs to.
    pub course_id: i64,
    /// Group name, matched against the allow-list.
    pub name: String,
}

/// An LMS user from the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterUser {
    /// Host-side user id.
    pub id: i64,
    /// LMS username, fallback for chat username derivation.
    pub username: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address; its local part is the preferred chat username.
    pub email: String,
}

/// One enrolment of a user in a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrolment {
    /// Host-side enrolment id.
    pub id: i64,
    /// Enrolled course.
    pub course_id: i64,
    /// Enrolled user.
    pub user_id: i64,
    /// Host-side status code; `1` means suspended, everything else active.
    pub status: i64,
}

/// One row of the admin overview: every course with its sync state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseOverview {
    /// Course id.
    pub course_id: i64,
    /// Course short name.
    pub short_name: String,
    /// Pending-sync flag; false when no sync row exists.
    pub pending_sync: bool,
    /// Event-based-sync flag; false when no sync row exists.
    pub event_based_sync: bool,
    /// Last sync timestamp, when any.
    pub last_sync: Option<i64>,
    /// Last error string, when any.
    pub last_error: Option<String>,
}

/// One row of the role overview: every assigned role with its sync flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleOverview {
    /// Role id.
    pub role_id: i64,
    /// Require-sync flag; false when no role row exists.
    pub require_sync: bool,
}

/// Sync state owned by the bridge.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Look up the sync row for a course.
    async fn course_sync(&self, course_id: i64) -> StorageResult<Option<CourseSyncRecord>>;

    /// Create a sync row for a course.
    async fn create_course_sync(
        &self,
        course_id: i64,
        pending_sync: bool,
    ) -> StorageResult<CourseSyncRecord>;

    /// Overwrite a sync row with the given record's fields.
    async fn update_course_sync(&self, record: &CourseSyncRecord) -> StorageResult<()>;

    /// All courses currently flagged for sync.
    async fn pending_courses(&self) -> StorageResult<Vec<CourseSyncRecord>>;

    /// Set (upserting) the pending-sync flag for a course.
    async fn set_pending_sync(&self, course_id: i64, pending_sync: bool) -> StorageResult<()>;

    /// Set (upserting) the event-based-sync flag for a course.
    async fn set_event_based_sync(&self, course_id: i64, enabled: bool) -> StorageResult<()>;

    /// Look up the sync flag row for a role.
    async fn role_sync(&self, role_id: i64) -> StorageResult<Option<RoleSyncRecord>>;

    /// Set (upserting) the require-sync flag for a role.
    async fn set_role_sync(&self, role_id: i64, require_sync: bool) -> StorageResult<()>;

    /// Every course joined with its sync state (admin view).
    async fn course_overview(&self) -> StorageResult<Vec<CourseOverview>>;

    /// Every role that appears in a role assignment, with its sync flag.
    async fn role_overview(&self) -> StorageResult<Vec<RoleOverview>>;
}

/// Local replica of the host LMS roster.
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Look up a course.
    async fn course(&self, id: i64) -> StorageResult<Option<Course>>;

    /// Look up a group.
    async fn group(&self, id: i64) -> StorageResult<Option<Group>>;

    /// All groups of a course.
    async fn groups_for_course(&self, course_id: i64) -> StorageResult<Vec<Group>>;

    /// All users who are members of a group.
    async fn group_members(&self, group_id: i64) -> StorageResult<Vec<RosterUser>>;

    /// All users enrolled in a course.
    async fn enrolled_users(&self, course_id: i64) -> StorageResult<Vec<RosterUser>>;

    /// Look up a user.
    async fn user(&self, id: i64) -> StorageResult<Option<RosterUser>>;

    /// Look up an enrolment.
    async fn enrolment(&self, id: i64) -> StorageResult<Option<Enrolment>>;

    /// Role ids a user holds in a course.
    async fn user_roles_in_course(&self, user_id: i64, course_id: i64)
        -> StorageResult<Vec<i64>>;

    /// Insert or replace a course.
    async fn upsert_course(&self, course: &Course) -> StorageResult<()>;

    /// Insert or replace a group.
    async fn upsert_group(&self, group: &Group) -> StorageResult<()>;

    /// Insert or replace a user.
    async fn upsert_user(&self, user: &RosterUser) -> StorageResult<()>;

    /// Insert or replace an enrolment.
    async fn upsert_enrolment(&self, enrolment: &Enrolment) -> StorageResult<()>;

    /// Add a user to a group (idempotent).
    async fn add_group_member(&self, group_id: i64, user_id: i64) -> StorageResult<()>;

    /// Record a role assignment (idempotent).
    async fn add_role_assignment(
        &self,
        course_id: i64,
        user_id: i64,
        role_id: i64,
    ) -> StorageResult<()>;
}
