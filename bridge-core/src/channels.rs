//! Channel management: one private channel per allow-listed course group.

use crate::api::{self, ChannelCreateResponse, GenericResponse, GroupInfoResponse, RoomsGetResponse};
use crate::client::AuthClient;
use crate::error::{BridgeError, Result};
use crate::storage::{Group, RosterStore};
use crate::sync::{codes, SyncErrorEntry};
use regex::Regex;
use serde_json::json;

/// Newline-separated regex allow-list for group names.
///
/// A group gets a channel iff at least one pattern matches its name; an
/// empty list matches nothing. Invalid patterns are skipped with a warning.
#[derive(Debug, Clone, Default)]
pub struct GroupAllowList {
    patterns: Vec<Regex>,
}

impl GroupAllowList {
    /// Parse an allow-list from newline-separated regex patterns.
    pub fn parse(text: &str) -> Self {
        let mut patterns = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match Regex::new(line) {
                Ok(regex) => patterns.push(regex),
                Err(e) => tracing::warn!("skipping invalid group regex {:?}: {}", line, e),
            }
        }

        Self { patterns }
    }

    /// Whether a group with this name requires a channel.
    pub fn matches(&self, group_name: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(group_name))
    }
}

/// Channel name for a course group: `shortname-groupname`, spaces replaced
/// with underscores. Must be recomputed identically on every call or
/// duplicate channels result.
pub fn derive_channel_name(course_short_name: &str, group_name: &str) -> String {
    format!("{}-{}", course_short_name, group_name).replace(' ', "_")
}

/// Manager that mirrors course groups into private channels.
pub struct ChannelSync<'a> {
    client: &'a AuthClient,
    roster: &'a dyn RosterStore,
    allow_list: &'a GroupAllowList,
    errors: Vec<SyncErrorEntry>,
}

impl<'a> ChannelSync<'a> {
    /// Create a manager bound to one authenticated client.
    pub fn new(
        client: &'a AuthClient,
        roster: &'a dyn RosterStore,
        allow_list: &'a GroupAllowList,
    ) -> Self {
        Self {
            client,
            roster,
            allow_list,
            errors: Vec::new(),
        }
    }

    /// Drain the errors collected so far.
    pub fn take_errors(&mut self) -> Vec<SyncErrorEntry> {
        std::mem::take(&mut self.errors)
    }

    /// Ensure a private channel exists for every allow-listed group of the
    /// course. Remote failures are collected, not returned; processing
    /// continues with the remaining groups.
    pub async fn create_channels_for_course(&mut self, course_id: i64) -> Result<()> {
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
            self.ensure_channel(&channel_name).await;
        }

        Ok(())
    }

    /// Direct lookup of the private channel backing a group.
    ///
    /// Returns the room id when the channel exists. Used by the
    /// membership-event path to skip work when there is nothing to join.
    pub async fn has_channel_for_group(&self, group: &Group) -> Result<Option<String>> {
        let course = self
            .roster
            .course(group.course_id)
            .await?
            .ok_or(BridgeError::NotFound {
                kind: "course",
                id: group.course_id,
            })?;

        let channel_name = derive_channel_name(&course.short_name, &group.name);
        Ok(room_id_for_name(self.client, &channel_name).await)
    }

    async fn ensure_channel(&mut self, channel_name: &str) {
        if !self.channel_exists(channel_name).await {
            self.create_channel(channel_name).await;
        }
    }

    /// Linear scan over the full room listing, fetched fresh for every
    /// group. Exact, case-sensitive name match.
    async fn channel_exists(&self, channel_name: &str) -> bool {
        self.existing_channels()
            .await
            .iter()
            .any(|name| name == channel_name)
    }

    async fn existing_channels(&self) -> Vec<String> {
        let value = match self.client.get(api::paths::ROOMS_GET).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("room listing failed: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_value::<RoomsGetResponse>(value) {
            Ok(response) => response.update.into_iter().filter_map(|r| r.name).collect(),
            Err(e) => {
                tracing::warn!("room listing malformed: {}", e);
                Vec::new()
            }
        }
    }

    /// Two sequential calls: create the channel, then flip it to private.
    /// Either failure appends a `channel_creation` entry.
    async fn create_channel(&mut self, channel_name: &str) {
        let created = self
            .client
            .post(api::paths::CHANNELS_CREATE, json!({ "name": channel_name }))
            .await;

        let response: ChannelCreateResponse = match created
            .map_err(BridgeError::from)
            .and_then(|v| serde_json::from_value(v).map_err(BridgeError::from))
        {
            Ok(response) => response,
            Err(e) => {
                self.errors
                    .push(SyncErrorEntry::new(codes::CHANNEL_CREATION, e.to_string()));
                return;
            }
        };

        let room_id = match (response.success, response.channel) {
            (true, Some(channel)) => channel.id,
            _ => {
                self.errors.push(SyncErrorEntry::new(
                    codes::CHANNEL_CREATION,
                    response.error.unwrap_or_else(|| "unknown error".to_string()),
                ));
                return;
            }
        };

        let set_type = self
            .client
            .post(
                api::paths::CHANNELS_SET_TYPE,
                json!({ "roomId": room_id, "type": "p" }),
            )
            .await;

        match set_type
            .map_err(BridgeError::from)
            .and_then(|v| {
                serde_json::from_value::<GenericResponse>(v).map_err(BridgeError::from)
            }) {
            Ok(response) if response.success => {}
            Ok(response) => self.errors.push(SyncErrorEntry::new(
                codes::CHANNEL_CREATION,
                response.error_message(),
            )),
            Err(e) => self
                .errors
                .push(SyncErrorEntry::new(codes::CHANNEL_CREATION, e.to_string())),
        }
    }
}

/// Private group lookup by exact room name; `None` covers both "no such
/// room" and a failed call.
pub(crate) async fn room_id_for_name(client: &AuthClient, channel_name: &str) -> Option<String> {
    let path = format!("{}?roomName={}", api::paths::GROUPS_INFO, channel_name);

    let value = match client.get(&path).await {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("group lookup for {:?} failed: {}", channel_name, e);
            return None;
        }
    };

    match serde_json::from_value::<GroupInfoResponse>(value) {
        Ok(response) if response.success => response.group.map(|g| g.id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChatConfig, Protocol};
    use crate::storage::{Course, RosterStore, SqliteStorage};
    use crate::transport::{MockTransport, Method};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn chat_config() -> ChatConfig {
        ChatConfig {
            host: "chat.example.org".to_string(),
            port: None,
            protocol: Protocol::Https,
            username: "admin".to_string(),
            password: "secret".to_string(),
        }
    }

    fn login_success() -> Value {
        json!({"status": "success", "data": {"authToken": "t", "userId": "u"}})
    }

    async fn authed_client(transport: &MockTransport) -> AuthClient {
        transport.queue_response(login_success());
        AuthClient::connect(&chat_config(), Arc::new(transport.clone())).await
    }

    async fn roster_with_course_and_groups(groups: &[(i64, &str)]) -> SqliteStorage {
        let storage = SqliteStorage::in_memory().await.unwrap();
        storage
            .upsert_course(&Course {
                id: 1,
                short_name: "CS101".to_string(),
                full_name: String::new(),
            })
            .await
            .unwrap();
        for (id, name) in groups {
            storage
                .upsert_group(&Group {
                    id: *id,
                    course_id: 1,
                    name: name.to_string(),
                })
                .await
                .unwrap();
        }
        storage
    }

    #[test]
    fn allow_list_or_semantics() {
        let allow = GroupAllowList::parse(".*Lab.*\n^Tutorial-\\d+$");
        assert!(allow.matches("Lab-A"));
        assert!(allow.matches("Tutorial-3"));
        assert!(!allow.matches("Misc"));
    }

    #[test]
    fn empty_allow_list_matches_nothing() {
        let allow = GroupAllowList::parse("");
        assert!(!allow.matches("Lab-A"));
        assert!(!allow.matches(""));
    }

    #[test]
    fn allow_list_skips_invalid_patterns() {
        let allow = GroupAllowList::parse("(((\n.*Lab.*");
        assert!(allow.matches("Lab-A"));
        assert!(!allow.matches("Misc"));
    }

    #[test]
    fn channel_name_replaces_spaces() {
        assert_eq!(derive_channel_name("CS 101", "Lab A"), "CS_101-Lab_A");
    }

    #[test]
    fn channel_name_is_deterministic() {
        let a = derive_channel_name("CS101", "Lab-A");
        let b = derive_channel_name("CS101", "Lab-A");
        assert_eq!(a, b);
        assert_eq!(a, "CS101-Lab-A");
    }

    #[tokio::test]
    async fn creates_channels_for_matching_groups_only() {
        let transport = MockTransport::new();
        let client = authed_client(&transport).await;
        let storage =
            roster_with_course_and_groups(&[(10, "Lab-A"), (11, "Lab-B"), (12, "Misc")]).await;
        let allow = GroupAllowList::parse(".*Lab.*");

        // Per matching group: rooms.get (empty), channels.create, channels.setType
        for _ in 0..2 {
            transport.queue_response(json!({"update": []}));
            transport.queue_response(json!({"success": true, "channel": {"_id": "r"}}));
            transport.queue_response(json!({"success": true}));
        }

        let mut channels = ChannelSync::new(&client, &storage, &allow);
        channels.create_channels_for_course(1).await.unwrap();

        assert!(channels.take_errors().is_empty());

        let created: Vec<String> = transport
            .requests()
            .iter()
            .filter(|r| r.path == "/api/v1/channels.create")
            .map(|r| r.body.as_ref().unwrap()["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(created, vec!["CS101-Lab-A", "CS101-Lab-B"]);
    }

    #[tokio::test]
    async fn existing_channel_is_not_recreated() {
        let transport = MockTransport::new();
        let client = authed_client(&transport).await;
        let storage = roster_with_course_and_groups(&[(10, "Lab-A")]).await;
        let allow = GroupAllowList::parse(".*Lab.*");

        transport.queue_response(json!({"update": [{"name": "CS101-Lab-A"}]}));

        let mut channels = ChannelSync::new(&client, &storage, &allow);
        channels.create_channels_for_course(1).await.unwrap();

        assert!(channels.take_errors().is_empty());
        assert!(transport
            .requests()
            .iter()
            .all(|r| r.path != "/api/v1/channels.create"));
    }

    #[tokio::test]
    async fn name_match_is_case_sensitive() {
        let transport = MockTransport::new();
        let client = authed_client(&transport).await;
        let storage = roster_with_course_and_groups(&[(10, "Lab-A")]).await;
        let allow = GroupAllowList::parse(".*Lab.*");

        // Listing contains a lowercase variant only, so creation proceeds.
        transport.queue_response(json!({"update": [{"name": "cs101-lab-a"}]}));
        transport.queue_response(json!({"success": true, "channel": {"_id": "r"}}));
        transport.queue_response(json!({"success": true}));

        let mut channels = ChannelSync::new(&client, &storage, &allow);
        channels.create_channels_for_course(1).await.unwrap();

        assert_eq!(
            transport
                .requests()
                .iter()
                .filter(|r| r.path == "/api/v1/channels.create")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn failed_creation_is_collected_and_processing_continues() {
        let transport = MockTransport::new();
        let client = authed_client(&transport).await;
        let storage = roster_with_course_and_groups(&[(10, "Lab-A"), (11, "Lab-B")]).await;
        let allow = GroupAllowList::parse(".*Lab.*");

        // Lab-A fails at channels.create; Lab-B succeeds.
        transport.queue_response(json!({"update": []}));
        transport.queue_response(json!({"success": false, "error": "name already taken"}));
        transport.queue_response(json!({"update": []}));
        transport.queue_response(json!({"success": true, "channel": {"_id": "r"}}));
        transport.queue_response(json!({"success": true}));

        let mut channels = ChannelSync::new(&client, &storage, &allow);
        channels.create_channels_for_course(1).await.unwrap();

        let errors = channels.take_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, codes::CHANNEL_CREATION);
        assert_eq!(errors[0].detail, "name already taken");

        // The second group was still processed.
        assert_eq!(
            transport
                .requests()
                .iter()
                .filter(|r| r.path == "/api/v1/channels.create")
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn failed_set_type_is_collected() {
        let transport = MockTransport::new();
        let client = authed_client(&transport).await;
        let storage = roster_with_course_and_groups(&[(10, "Lab-A")]).await;
        let allow = GroupAllowList::parse(".*Lab.*");

        transport.queue_response(json!({"update": []}));
        transport.queue_response(json!({"success": true, "channel": {"_id": "room-1"}}));
        transport.queue_response(json!({"success": false, "error": "not allowed"}));

        let mut channels = ChannelSync::new(&client, &storage, &allow);
        channels.create_channels_for_course(1).await.unwrap();

        let errors = channels.take_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].detail, "not allowed");

        let set_type = transport
            .requests()
            .iter()
            .find(|r| r.path == "/api/v1/channels.setType")
            .cloned()
            .unwrap();
        assert_eq!(set_type.body, Some(json!({"roomId": "room-1", "type": "p"})));
    }

    #[tokio::test]
    async fn has_channel_for_group_returns_room_id() {
        let transport = MockTransport::new();
        let client = authed_client(&transport).await;
        let storage = roster_with_course_and_groups(&[(10, "Lab-A")]).await;
        let allow = GroupAllowList::default();

        transport.queue_response(json!({"success": true, "group": {"_id": "room-9"}}));

        let channels = ChannelSync::new(&client, &storage, &allow);
        let group = Group {
            id: 10,
            course_id: 1,
            name: "Lab-A".to_string(),
        };
        let room = channels.has_channel_for_group(&group).await.unwrap();

        assert_eq!(room.as_deref(), Some("room-9"));
        let lookup = transport.last_request().unwrap();
        assert_eq!(lookup.method, Method::Get);
        assert_eq!(lookup.path, "/api/v1/groups.info?roomName=CS101-Lab-A");
    }

    #[tokio::test]
    async fn has_channel_for_group_none_when_lookup_fails() {
        let transport = MockTransport::new();
        let client = authed_client(&transport).await;
        let storage = roster_with_course_and_groups(&[(10, "Lab-A")]).await;
        let allow = GroupAllowList::default();

        transport.queue_response(json!({"success": false}));

        let channels = ChannelSync::new(&client, &storage, &allow);
        let group = Group {
            id: 10,
            course_id: 1,
            name: "Lab-A".to_string(),
        };
        assert!(channels.has_channel_for_group(&group).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_course_is_not_found() {
        let transport = MockTransport::new();
        let client = authed_client(&transport).await;
        let storage = SqliteStorage::in_memory().await.unwrap();
        let allow = GroupAllowList::default();

        let mut channels = ChannelSync::new(&client, &storage, &allow);
        let result = channels.create_channels_for_course(99).await;

        assert!(matches!(
            result,
            Err(BridgeError::NotFound { kind: "course", id: 99 })
        ));
    }
}
