//! SQLite storage backend for roster-bridge.

use super::{
    Course, CourseOverview, CourseSyncRecord, Enrolment, Group, RoleOverview, RoleSyncRecord,
    RosterStore, RosterUser, SyncStore,
};
use crate::error::StorageError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// SQLite-backed sync state and roster replica.
///
/// Uses WAL mode for concurrent reads/writes.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage from a database path.
    ///
    /// Creates the database file if it doesn't exist.
    pub async fn new(path: &Path) -> Result<Self, StorageError> {
        let path_str = path.to_str().ok_or_else(|| StorageError::InvalidPath {
            path: path.to_path_buf(),
        })?;

        let options = SqliteConnectOptions::from_str(path_str)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Create an in-memory SQLite storage (for testing).
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(":memory:")?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), StorageError> {
        // Sync state owned by the bridge
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS course_sync (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                course INTEGER NOT NULL UNIQUE,
                pendingsync INTEGER NOT NULL DEFAULT 0,
                eventbasedsync INTEGER NOT NULL DEFAULT 0,
                lastsync INTEGER,
                error TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS role_sync (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                role INTEGER NOT NULL UNIQUE,
                requiresync INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Roster replica fed by the host LMS
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS courses (
                id INTEGER PRIMARY KEY,
                shortname TEXT NOT NULL,
                fullname TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS course_groups (
                id INTEGER PRIMARY KEY,
                courseid INTEGER NOT NULL,
                name TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS group_members (
                groupid INTEGER NOT NULL,
                userid INTEGER NOT NULL,
                PRIMARY KEY (groupid, userid)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS roster_users (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL,
                firstname TEXT NOT NULL,
                lastname TEXT NOT NULL,
                email TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS enrolments (
                id INTEGER PRIMARY KEY,
                courseid INTEGER NOT NULL,
                userid INTEGER NOT NULL,
                status INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS role_assignments (
                courseid INTEGER NOT NULL,
                userid INTEGER NOT NULL,
                roleid INTEGER NOT NULL,
                PRIMARY KEY (courseid, userid, roleid)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_groups_course ON course_groups(courseid)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_enrolments_course ON enrolments(courseid)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl SyncStore for SqliteStorage {
    async fn course_sync(&self, course_id: i64) -> Result<Option<CourseSyncRecord>, StorageError> {
        let row = sqlx::query_as::<_, CourseSyncRow>(
            "SELECT id, course, pendingsync, eventbasedsync, lastsync, error
             FROM course_sync WHERE course = ?1",
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CourseSyncRecord::from))
    }

    async fn create_course_sync(
        &self,
        course_id: i64,
        pending_sync: bool,
    ) -> Result<CourseSyncRecord, StorageError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO course_sync (course, pendingsync) VALUES (?1, ?2) RETURNING id",
        )
        .bind(course_id)
        .bind(pending_sync as i64)
        .fetch_one(&self.pool)
        .await?;

        Ok(CourseSyncRecord {
            id,
            course_id,
            pending_sync,
            event_based_sync: false,
            last_sync: None,
            last_error: None,
        })
    }

    async fn update_course_sync(&self, record: &CourseSyncRecord) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE course_sync
             SET pendingsync = ?1, eventbasedsync = ?2, lastsync = ?3, error = ?4
             WHERE id = ?5",
        )
        .bind(record.pending_sync as i64)
        .bind(record.event_based_sync as i64)
        .bind(record.last_sync)
        .bind(&record.last_error)
        .bind(record.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn pending_courses(&self) -> Result<Vec<CourseSyncRecord>, StorageError> {
        let rows = sqlx::query_as::<_, CourseSyncRow>(
            "SELECT id, course, pendingsync, eventbasedsync, lastsync, error
             FROM course_sync WHERE pendingsync = 1 ORDER BY course",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CourseSyncRecord::from).collect())
    }

    async fn set_pending_sync(
        &self,
        course_id: i64,
        pending_sync: bool,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO course_sync (course, pendingsync) VALUES (?1, ?2)
             ON CONFLICT(course) DO UPDATE SET pendingsync = ?2",
        )
        .bind(course_id)
        .bind(pending_sync as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_event_based_sync(&self, course_id: i64, enabled: bool) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO course_sync (course, eventbasedsync) VALUES (?1, ?2)
             ON CONFLICT(course) DO UPDATE SET eventbasedsync = ?2",
        )
        .bind(course_id)
        .bind(enabled as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn role_sync(&self, role_id: i64) -> Result<Option<RoleSyncRecord>, StorageError> {
        let row = sqlx::query_as::<_, RoleSyncRow>(
            "SELECT id, role, requiresync FROM role_sync WHERE role = ?1",
        )
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RoleSyncRecord::from))
    }

    async fn set_role_sync(&self, role_id: i64, require_sync: bool) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO role_sync (role, requiresync) VALUES (?1, ?2)
             ON CONFLICT(role) DO UPDATE SET requiresync = ?2",
        )
        .bind(role_id)
        .bind(require_sync as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn course_overview(&self) -> Result<Vec<CourseOverview>, StorageError> {
        let rows = sqlx::query_as::<_, CourseOverviewRow>(
            r#"
            SELECT
                c.id AS courseid,
                c.shortname,
                COALESCE(cs.pendingsync, 0) AS pendingsync,
                COALESCE(cs.eventbasedsync, 0) AS eventbasedsync,
                cs.lastsync,
                cs.error
            FROM courses c
            LEFT JOIN course_sync cs ON cs.course = c.id
            ORDER BY c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CourseOverview::from).collect())
    }

    async fn role_overview(&self) -> Result<Vec<RoleOverview>, StorageError> {
        let rows = sqlx::query_as::<_, RoleOverviewRow>(
            r#"
            SELECT DISTINCT
                ra.roleid,
                COALESCE(rs.requiresync, 0) AS requiresync
            FROM role_assignments ra
            LEFT JOIN role_sync rs ON rs.role = ra.roleid
            ORDER BY ra.roleid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RoleOverview::from).collect())
    }
}

#[async_trait]
impl RosterStore for SqliteStorage {
    async fn course(&self, id: i64) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query_as::<_, CourseRow>(
            "SELECT id, shortname, fullname FROM courses WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Course::from))
    }

    async fn group(&self, id: i64) -> Result<Option<Group>, StorageError> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, courseid, name FROM course_groups WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Group::from))
    }

    async fn groups_for_course(&self, course_id: i64) -> Result<Vec<Group>, StorageError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT id, courseid, name FROM course_groups WHERE courseid = ?1 ORDER BY id",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Group::from).collect())
    }

    async fn group_members(&self, group_id: i64) -> Result<Vec<RosterUser>, StorageError> {
        let rows = sqlx::query_as::<_, RosterUserRow>(
            r#"
            SELECT u.id, u.username, u.firstname, u.lastname, u.email
            FROM roster_users u
            JOIN group_members gm ON gm.userid = u.id
            WHERE gm.groupid = ?1
            ORDER BY u.id
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RosterUser::from).collect())
    }

    async fn enrolled_users(&self, course_id: i64) -> Result<Vec<RosterUser>, StorageError> {
        let rows = sqlx::query_as::<_, RosterUserRow>(
            r#"
            SELECT u.id, u.username, u.firstname, u.lastname, u.email
            FROM roster_users u
            JOIN enrolments e ON e.userid = u.id
            WHERE e.courseid = ?1
            ORDER BY u.id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RosterUser::from).collect())
    }

    async fn user(&self, id: i64) -> Result<Option<RosterUser>, StorageError> {
        let row = sqlx::query_as::<_, RosterUserRow>(
            "SELECT id, username, firstname, lastname, email FROM roster_users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RosterUser::from))
    }

    async fn enrolment(&self, id: i64) -> Result<Option<Enrolment>, StorageError> {
        let row = sqlx::query_as::<_, EnrolmentRow>(
            "SELECT id, courseid, userid, status FROM enrolments WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Enrolment::from))
    }

    async fn user_roles_in_course(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Vec<i64>, StorageError> {
        let roles: Vec<i64> = sqlx::query_scalar(
            "SELECT roleid FROM role_assignments WHERE userid = ?1 AND courseid = ?2
             ORDER BY roleid",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO courses (id, shortname, fullname) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET shortname = ?2, fullname = ?3",
        )
        .bind(course.id)
        .bind(&course.short_name)
        .bind(&course.full_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_group(&self, group: &Group) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO course_groups (id, courseid, name) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET courseid = ?2, name = ?3",
        )
        .bind(group.id)
        .bind(group.course_id)
        .bind(&group.name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_user(&self, user: &RosterUser) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO roster_users (id, username, firstname, lastname, email)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 username = ?2, firstname = ?3, lastname = ?4, email = ?5",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_enrolment(&self, enrolment: &Enrolment) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO enrolments (id, courseid, userid, status) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET courseid = ?2, userid = ?3, status = ?4",
        )
        .bind(enrolment.id)
        .bind(enrolment.course_id)
        .bind(enrolment.user_id)
        .bind(enrolment.status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn add_group_member(&self, group_id: i64, user_id: i64) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO group_members (groupid, userid) VALUES (?1, ?2)
             ON CONFLICT(groupid, userid) DO NOTHING",
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn add_role_assignment(
        &self,
        course_id: i64,
        user_id: i64,
        role_id: i64,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO role_assignments (courseid, userid, roleid) VALUES (?1, ?2, ?3)
             ON CONFLICT(courseid, userid, roleid) DO NOTHING",
        )
        .bind(course_id)
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Internal row types for SQLite queries.
#[derive(sqlx::FromRow)]
struct CourseSyncRow {
    id: i64,
    course: i64,
    pendingsync: i64,
    eventbasedsync: i64,
    lastsync: Option<i64>,
    error: Option<String>,
}

impl From<CourseSyncRow> for CourseSyncRecord {
    fn from(row: CourseSyncRow) -> Self {
        CourseSyncRecord {
            id: row.id,
            course_id: row.course,
            pending_sync: row.pendingsync != 0,
            event_based_sync: row.eventbasedsync != 0,
            last_sync: row.lastsync,
            last_error: row.error,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RoleSyncRow {
    id: i64,
    role: i64,
    requiresync: i64,
}

impl From<RoleSyncRow> for RoleSyncRecord {
    fn from(row: RoleSyncRow) -> Self {
        RoleSyncRecord {
            id: row.id,
            role_id: row.role,
            require_sync: row.requiresync != 0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CourseRow {
    id: i64,
    shortname: String,
    fullname: String,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            id: row.id,
            short_name: row.shortname,
            full_name: row.fullname,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: i64,
    courseid: i64,
    name: String,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Group {
            id: row.id,
            course_id: row.courseid,
            name: row.name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RosterUserRow {
    id: i64,
    username: String,
    firstname: String,
    lastname: String,
    email: String,
}

impl From<RosterUserRow> for RosterUser {
    fn from(row: RosterUserRow) -> Self {
        RosterUser {
            id: row.id,
            username: row.username,
            first_name: row.firstname,
            last_name: row.lastname,
            email: row.email,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EnrolmentRow {
    id: i64,
    courseid: i64,
    userid: i64,
    status: i64,
}

impl From<EnrolmentRow> for Enrolment {
    fn from(row: EnrolmentRow) -> Self {
        Enrolment {
            id: row.id,
            course_id: row.courseid,
            user_id: row.userid,
            status: row.status,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CourseOverviewRow {
    courseid: i64,
    shortname: String,
    pendingsync: i64,
    eventbasedsync: i64,
    lastsync: Option<i64>,
    error: Option<String>,
}

impl From<CourseOverviewRow> for CourseOverview {
    fn from(row: CourseOverviewRow) -> Self {
        CourseOverview {
            course_id: row.courseid,
            short_name: row.shortname,
            pending_sync: row.pendingsync != 0,
            event_based_sync: row.eventbasedsync != 0,
            last_sync: row.lastsync,
            last_error: row.error,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RoleOverviewRow {
    roleid: i64,
    requiresync: i64,
}

impl From<RoleOverviewRow> for RoleOverview {
    fn from(row: RoleOverviewRow) -> Self {
        RoleOverview {
            role_id: row.roleid,
            require_sync: row.requiresync != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage() -> SqliteStorage {
        SqliteStorage::in_memory().await.unwrap()
    }

    fn user(id: i64, username: &str, email: &str) -> RosterUser {
        RosterUser {
            id,
            username: username.to_string(),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn course_sync_absent_is_none() {
        let storage = storage().await;
        assert!(storage.course_sync(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_and_fetch_course_sync() {
        let storage = storage().await;
        let record = storage.create_course_sync(42, true).await.unwrap();

        assert_eq!(record.course_id, 42);
        assert!(record.pending_sync);
        assert!(!record.event_based_sync);
        assert!(record.last_sync.is_none());

        let fetched = storage.course_sync(42).await.unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[tokio::test]
    async fn update_course_sync_overwrites_all_fields() {
        let storage = storage().await;
        let mut record = storage.create_course_sync(1, true).await.unwrap();

        record.pending_sync = false;
        record.last_sync = Some(1_700_000_000);
        record.last_error = Some("[channel_creation] boom".to_string());
        storage.update_course_sync(&record).await.unwrap();

        let fetched = storage.course_sync(1).await.unwrap().unwrap();
        assert!(!fetched.pending_sync);
        assert_eq!(fetched.last_sync, Some(1_700_000_000));
        assert_eq!(
            fetched.last_error.as_deref(),
            Some("[channel_creation] boom")
        );
    }

    #[tokio::test]
    async fn pending_courses_lists_only_flagged() {
        let storage = storage().await;
        storage.create_course_sync(1, true).await.unwrap();
        storage.create_course_sync(2, false).await.unwrap();
        storage.create_course_sync(3, true).await.unwrap();

        let pending = storage.pending_courses().await.unwrap();
        let ids: Vec<i64> = pending.iter().map(|r| r.course_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn set_pending_sync_upserts() {
        let storage = storage().await;

        // No row yet: insert
        storage.set_pending_sync(7, true).await.unwrap();
        assert!(storage.course_sync(7).await.unwrap().unwrap().pending_sync);

        // Row exists: update in place
        storage.set_pending_sync(7, false).await.unwrap();
        assert!(!storage.course_sync(7).await.unwrap().unwrap().pending_sync);
    }

    #[tokio::test]
    async fn set_event_based_sync_keeps_pending_flag() {
        let storage = storage().await;
        storage.set_pending_sync(7, true).await.unwrap();
        storage.set_event_based_sync(7, true).await.unwrap();

        let record = storage.course_sync(7).await.unwrap().unwrap();
        assert!(record.pending_sync);
        assert!(record.event_based_sync);
    }

    #[tokio::test]
    async fn role_sync_upsert_and_lookup() {
        let storage = storage().await;
        assert!(storage.role_sync(5).await.unwrap().is_none());

        storage.set_role_sync(5, true).await.unwrap();
        assert!(storage.role_sync(5).await.unwrap().unwrap().require_sync);

        storage.set_role_sync(5, false).await.unwrap();
        assert!(!storage.role_sync(5).await.unwrap().unwrap().require_sync);
    }

    #[tokio::test]
    async fn roster_upserts_and_lookups() {
        let storage = storage().await;

        storage
            .upsert_course(&Course {
                id: 1,
                short_name: "CS101".to_string(),
                full_name: "Computer Science 101".to_string(),
            })
            .await
            .unwrap();
        storage
            .upsert_group(&Group {
                id: 10,
                course_id: 1,
                name: "Lab-A".to_string(),
            })
            .await
            .unwrap();
        storage.upsert_user(&user(100, "jane", "jane.doe@example.com")).await.unwrap();
        storage.add_group_member(10, 100).await.unwrap();

        let course = storage.course(1).await.unwrap().unwrap();
        assert_eq!(course.short_name, "CS101");

        let groups = storage.groups_for_course(1).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Lab-A");

        let members = storage.group_members(10).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].email, "jane.doe@example.com");
    }

    #[tokio::test]
    async fn enrolled_users_follow_enrolments() {
        let storage = storage().await;
        storage.upsert_user(&user(1, "a", "a@example.com")).await.unwrap();
        storage.upsert_user(&user(2, "b", "b@example.com")).await.unwrap();
        storage
            .upsert_enrolment(&Enrolment {
                id: 50,
                course_id: 9,
                user_id: 1,
                status: 0,
            })
            .await
            .unwrap();

        let enrolled = storage.enrolled_users(9).await.unwrap();
        assert_eq!(enrolled.len(), 1);
        assert_eq!(enrolled[0].id, 1);

        let enrolment = storage.enrolment(50).await.unwrap().unwrap();
        assert_eq!(enrolment.user_id, 1);
        assert_eq!(enrolment.status, 0);
    }

    #[tokio::test]
    async fn role_assignments_are_idempotent() {
        let storage = storage().await;
        storage.add_role_assignment(1, 100, 5).await.unwrap();
        storage.add_role_assignment(1, 100, 5).await.unwrap();
        storage.add_role_assignment(1, 100, 6).await.unwrap();

        let roles = storage.user_roles_in_course(100, 1).await.unwrap();
        assert_eq!(roles, vec![5, 6]);
    }

    #[tokio::test]
    async fn course_overview_includes_courses_without_sync_rows() {
        let storage = storage().await;
        storage
            .upsert_course(&Course {
                id: 1,
                short_name: "CS101".to_string(),
                full_name: String::new(),
            })
            .await
            .unwrap();
        storage
            .upsert_course(&Course {
                id: 2,
                short_name: "CS102".to_string(),
                full_name: String::new(),
            })
            .await
            .unwrap();
        storage.set_pending_sync(2, true).await.unwrap();

        let overview = storage.course_overview().await.unwrap();
        assert_eq!(overview.len(), 2);
        assert!(!overview[0].pending_sync);
        assert!(overview[1].pending_sync);
        assert!(overview[0].last_sync.is_none());
    }

    #[tokio::test]
    async fn role_overview_covers_assigned_roles() {
        let storage = storage().await;
        storage.add_role_assignment(1, 100, 5).await.unwrap();
        storage.add_role_assignment(1, 101, 6).await.unwrap();
        storage.set_role_sync(5, true).await.unwrap();

        let overview = storage.role_overview().await.unwrap();
        assert_eq!(overview.len(), 2);
        assert!(overview[0].require_sync);
        assert!(!overview[1].require_sync);
    }

    #[tokio::test]
    async fn file_backed_storage_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.db");

        {
            let storage = SqliteStorage::new(&path).await.unwrap();
            storage.set_pending_sync(1, true).await.unwrap();
        }

        let storage = SqliteStorage::new(&path).await.unwrap();
        assert!(storage.course_sync(1).await.unwrap().unwrap().pending_sync);
    }
}
