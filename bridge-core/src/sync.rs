//! Full-course sync orchestration.
//!
//! A sync run walks three stages per course (channels, users,
//! subscriptions), lets each stage fail soft, and persists one aggregated
//! result on the course's sync row. The run itself only fails on local
//! storage errors; remote trouble ends up in `last_error`.

use crate::channels::{ChannelSync, GroupAllowList};
use crate::client::AuthClient;
use crate::error::Result;
use crate::storage::{current_timestamp, CourseSyncRecord, RosterStore, SyncStore};
use crate::subscriptions::SubscriptionSync;
use crate::users::UserSync;

/// Error codes for aggregated sync errors, stable across releases since
/// operators grep for them.
pub mod codes {
    /// The administrator login failed; no stage ran.
    pub const AUTH_FAILURE: &str = "auth_failure";
    /// A channel could not be created or made private.
    pub const CHANNEL_CREATION: &str = "channel_creation";
    /// A chat account could not be created.
    pub const USER_CREATION: &str = "user_creation";
    /// A user could not be invited into a channel.
    pub const SUBSCRIPTION_CREATION: &str = "subscription_creation";
}

/// One collected sync error: a stage code plus free-form detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncErrorEntry {
    /// Stage code from [`codes`].
    pub code: &'static str,
    /// What went wrong, including backend error text where available.
    pub detail: String,
}

impl SyncErrorEntry {
    /// Create an entry.
    pub fn new(code: &'static str, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    /// The `[code] detail` line format used in `last_error`.
    fn render(&self) -> String {
        format!("[{}] {}", self.code, self.detail)
    }
}

/// Join collected entries into the `last_error` column value; `None` for a
/// clean run.
fn render_errors(errors: &[SyncErrorEntry]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }
    Some(
        errors
            .iter()
            .map(SyncErrorEntry::render)
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Orchestrator for full course syncs.
pub struct SyncRunner<'a, S> {
    client: &'a AuthClient,
    storage: &'a S,
    allow_list: GroupAllowList,
    errors: Vec<SyncErrorEntry>,
}

impl<'a, S> SyncRunner<'a, S>
where
    S: SyncStore + RosterStore,
{
    /// Create a runner bound to one client and one store.
    pub fn new(client: &'a AuthClient, storage: &'a S, allow_list: GroupAllowList) -> Self {
        Self {
            client,
            storage,
            allow_list,
            errors: Vec::new(),
        }
    }

    /// Run a full sync for one course and persist the outcome.
    ///
    /// The sync row is created on first contact. Every run terminates the
    /// pending state: `pending_sync` is cleared and `last_sync` stamped no
    /// matter how many stages failed. Returns the persisted record.
    pub async fn sync_course(&mut self, course_id: i64) -> Result<CourseSyncRecord> {
        let mut record = match self.storage.course_sync(course_id).await? {
            Some(record) => record,
            None => self.storage.create_course_sync(course_id, true).await?,
        };

        tracing::info!(course_id, "starting course sync");

        if self.client.authenticated() {
            self.run_stages(course_id).await;
        } else {
            self.errors.push(SyncErrorEntry::new(
                codes::AUTH_FAILURE,
                format!(
                    "could not authenticate against {}",
                    self.client.instance_url()
                ),
            ));
        }

        let errors = std::mem::take(&mut self.errors);
        if !errors.is_empty() {
            tracing::warn!(course_id, count = errors.len(), "course sync collected errors");
        }

        record.pending_sync = false;
        record.last_sync = Some(current_timestamp());
        record.last_error = render_errors(&errors);
        self.storage.update_course_sync(&record).await?;

        Ok(record)
    }

    /// All three stages run unconditionally, in order; a failing stage never
    /// stops the next one.
    async fn run_stages(&mut self, course_id: i64) {
        let mut channels = ChannelSync::new(self.client, self.storage, &self.allow_list);
        if let Err(e) = channels.create_channels_for_course(course_id).await {
            tracing::warn!(course_id, "channel stage aborted: {}", e);
        }
        self.errors.extend(channels.take_errors());

        let mut users = UserSync::new(self.client, self.storage);
        if let Err(e) = users.create_users_for_course(course_id).await {
            tracing::warn!(course_id, "user stage aborted: {}", e);
        }
        self.errors.extend(users.take_errors());

        let mut subscriptions =
            SubscriptionSync::new(self.client, self.storage, self.storage, &self.allow_list);
        if let Err(e) = subscriptions.add_subscriptions_for_course(course_id).await {
            tracing::warn!(course_id, "subscription stage aborted: {}", e);
        }
        self.errors.extend(subscriptions.take_errors());
    }

    /// Sync every course currently flagged as pending, each independently.
    /// A course whose sync fails locally is logged and skipped; the others
    /// still run.
    pub async fn sync_pending_courses(&mut self) -> Result<Vec<CourseSyncRecord>> {
        let pending = self.storage.pending_courses().await?;
        let mut results = Vec::with_capacity(pending.len());

        for course in pending {
            match self.sync_course(course.course_id).await {
                Ok(record) => results.push(record),
                Err(e) => {
                    tracing::error!(course_id = course.course_id, "course sync failed: {}", e)
                }
            }
        }

        Ok(results)
    }
}

/// Whether membership events should trigger incremental updates for the
/// course. A course without a sync row has never been synced and defaults
/// to off.
pub async fn is_event_based_sync_on_course(
    storage: &dyn SyncStore,
    course_id: i64,
) -> Result<bool> {
    Ok(storage
        .course_sync(course_id)
        .await?
        .map(|record| record.event_based_sync)
        .unwrap_or(false))
}
