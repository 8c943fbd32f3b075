//! Incremental updates driven by host membership events.
//!
//! Event delivery is best effort: the handler drops its work silently when
//! the backend is unreachable or the course has event-based sync turned
//! off, and the next full sync reconciles whatever was missed.

use crate::client::AuthClient;
use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::storage::{RosterStore, SyncStore};
use crate::subscriptions::SubscriptionSync;
use crate::sync::is_event_based_sync_on_course;
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A user was added to a course group on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMemberAdded {
    /// Course the group belongs to.
    pub course_id: i64,
    /// Group the user joined.
    pub group_id: i64,
    /// The joining user.
    pub user_id: i64,
}

/// React to a group-membership event with a single targeted subscription.
///
/// No-op unless the course has event-based sync enabled. Uses a fresh
/// client per event; if its login fails the event is dropped without error.
/// Remote subscription failures are logged, not persisted, since there is
/// no sync run to attach them to.
pub async fn handle_group_member_added<S>(
    event: &GroupMemberAdded,
    config: &Config,
    storage: &S,
    transport: Arc<dyn Transport>,
) -> Result<()>
where
    S: SyncStore + RosterStore,
{
    if !is_event_based_sync_on_course(storage, event.course_id).await? {
        return Ok(());
    }

    let group = storage
        .group(event.group_id)
        .await?
        .ok_or(BridgeError::NotFound {
            kind: "group",
            id: event.group_id,
        })?;

    let user = storage
        .user(event.user_id)
        .await?
        .ok_or(BridgeError::NotFound {
            kind: "user",
            id: event.user_id,
        })?;

    let client = AuthClient::connect(&config.chat, transport).await;
    if !client.authenticated() {
        tracing::debug!(
            course_id = event.course_id,
            "dropping membership event, backend login failed"
        );
        return Ok(());
    }

    let allow_list = Default::default();
    let mut subscriptions = SubscriptionSync::new(&client, storage, storage, &allow_list);
    subscriptions.add_subscription_for_user(&group, &user).await?;

    for error in subscriptions.take_errors() {
        tracing::warn!(
            course_id = event.course_id,
            code = error.code,
            "membership event subscription failed: {}",
            error.detail
        );
    }

    Ok(())
}
