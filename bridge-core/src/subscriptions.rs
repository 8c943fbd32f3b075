//! Subscription management: channel membership mirroring group membership.

use crate::api::{self, GenericResponse};
use crate::channels::{derive_channel_name, room_id_for_name, GroupAllowList};
use crate::client::AuthClient;
use crate::error::{BridgeError, Result};
use crate::storage::{Group, RosterStore, RosterUser, SyncStore};
use crate::sync::{codes, SyncErrorEntry};
use crate::users::UserSync;
use serde_json::json;

/// Manager that invites group members into their group's private channel.
///
/// During a full course sync only members holding a role flagged for sync
/// are invited; the event path skips the role filter because the host only
/// raises membership events for relevant users.
pub struct SubscriptionSync<'a> {
    client: &'a AuthClient,
    roster: &'a dyn RosterStore,
    sync_store: &'a dyn SyncStore,
    allow_list: &'a GroupAllowList,
    errors: Vec<SyncErrorEntry>,
}

impl<'a> SubscriptionSync<'a> {
    /// Create a manager bound to one authenticated client.
    pub fn new(
        client: &'a AuthClient,
        roster: &'a dyn RosterStore,
        sync_store: &'a dyn SyncStore,
        allow_list: &'a GroupAllowList,
    ) -> Self {
        Self {
            client,
            roster,
            sync_store,
            allow_list,
            errors: Vec::new(),
        }
    }

    /// Drain the errors collected so far.
    pub fn take_errors(&mut self) -> Vec<SyncErrorEntry> {
        std::mem::take(&mut self.errors)
    }

    /// Subscribe every role-gated member of every allow-listed group to the
    /// group's channel. Remote failures are collected, not returned.
    pub async fn add_subscriptions_for_course(&mut self, course_id: i64) -> Result<()> {
        let course = self
            .roster
            .course(course_id)
            .await?
            .ok_or(BridgeError::NotFound {
                kind: "course",
                id: course_id,
            })?;

        let groups = self.roster.groups_for_course(course_id).await?;

        for group in groups {
            if !self.allow_list.matches(&group.name) {
                continue;
            }

            let channel_name = derive_channel_name(&course.short_name, &group.name);
            let Some(room_id) = room_id_for_name(self.client, &channel_name).await else {
                tracing::warn!("no channel {:?} for group {}, skipping", channel_name, group.id);
                continue;
            };

            for member in self.roster.group_members(group.id).await? {
                if !self.member_requires_sync(&member, course_id).await? {
                    continue;
                }
                self.invite(&room_id, &member, &group.name).await;
            }
        }

        Ok(())
    }

    /// Subscribe one user to one group's channel, skipping the role filter.
    /// Used by the membership-event path. Does nothing when the channel does
    /// not exist yet; the next full sync will pick the membership up.
    pub async fn add_subscription_for_user(
        &mut self,
        group: &Group,
        user: &RosterUser,
    ) -> Result<()> {
        let course = self
            .roster
            .course(group.course_id)
            .await?
            .ok_or(BridgeError::NotFound {
                kind: "course",
                id: group.course_id,
            })?;

        let channel_name = derive_channel_name(&course.short_name, &group.name);
        let Some(room_id) = room_id_for_name(self.client, &channel_name).await else {
            tracing::debug!("no channel {:?} yet, deferring to full sync", channel_name);
            return Ok(());
        };

        self.invite(&room_id, user, &group.name).await;
        Ok(())
    }

    /// Whether the member holds at least one role flagged for sync in the
    /// course.
    async fn member_requires_sync(&self, member: &RosterUser, course_id: i64) -> Result<bool> {
        for role_id in self.roster.user_roles_in_course(member.id, course_id).await? {
            if let Some(role) = self.sync_store.role_sync(role_id).await? {
                if role.require_sync {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Invite one user into one room. A missing chat account or a failed
    /// invite appends a `subscription_creation` entry.
    async fn invite(&mut self, room_id: &str, user: &RosterUser, group_name: &str) {
        let lookup = UserSync::new(self.client, self.roster);
        let Some(chat_user_id) = lookup.get_user(user).await else {
            self.errors.push(SyncErrorEntry::new(
                codes::SUBSCRIPTION_CREATION,
                format!(
                    "[ user_id - {} | group - {} ] no chat account",
                    user.id, group_name
                ),
            ));
            return;
        };

        let body = json!({ "roomId": room_id, "userId": chat_user_id });
        let result = self
            .client
            .post(api::paths::CHANNELS_INVITE, body)
            .await
            .map_err(BridgeError::from)
            .and_then(|v| {
                serde_json::from_value::<GenericResponse>(v).map_err(BridgeError::from)
            });

        let detail = match result {
            Ok(response) if response.success => return,
            Ok(response) => response.error_message(),
            Err(e) => e.to_string(),
        };

        self.errors.push(SyncErrorEntry::new(
            codes::SUBSCRIPTION_CREATION,
            format!("[ user_id - {} | group - {} ] {}", user.id, group_name, detail),
        ));
    }
}
