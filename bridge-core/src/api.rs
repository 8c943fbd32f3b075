//! Typed payloads for the chat backend REST API.
//!
//! Each endpoint gets an explicit response type decoded at the request
//! boundary; the managers never poke at loose JSON. The backend reports
//! application failures inside the body (`status`/`success` fields), so the
//! response types model both the success and the error shape.

use serde::{Deserialize, Serialize};

/// REST endpoint paths.
pub mod paths {
    /// Login with username/password.
    pub const LOGIN: &str = "/api/v1/login";
    /// Private group lookup by room name (query: `roomName`).
    pub const GROUPS_INFO: &str = "/api/v1/groups.info";
    /// List of all rooms visible to the caller.
    pub const ROOMS_GET: &str = "/api/v1/rooms.get";
    /// Create a public channel.
    pub const CHANNELS_CREATE: &str = "/api/v1/channels.create";
    /// Change a room's type (public/private).
    pub const CHANNELS_SET_TYPE: &str = "/api/v1/channels.setType";
    /// Invite a user into a room.
    pub const CHANNELS_INVITE: &str = "/api/v1/channels.invite";
    /// List of all chat users.
    pub const USERS_LIST: &str = "/api/v1/users.list";
    /// Create a chat user.
    pub const USERS_CREATE: &str = "/api/v1/users.create";
    /// Chat user lookup by username (query: `username`).
    pub const USERS_INFO: &str = "/api/v1/users.info";
    /// Update a chat user (active flag).
    pub const USERS_UPDATE: &str = "/api/v1/users.update";
}

/// Response to `POST /api/v1/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// `"success"` on successful login, `"error"` otherwise.
    #[serde(default)]
    pub status: String,
    /// Session data, present on success.
    #[serde(default)]
    pub data: Option<LoginData>,
    /// Error message, present on failure.
    #[serde(default)]
    pub error: Option<String>,
    /// Human-readable message, present on some failures.
    #[serde(default)]
    pub message: Option<String>,
}

/// Session payload inside a successful login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginData {
    /// Session token for the `X-Auth-Token` header.
    #[serde(rename = "authToken", default)]
    pub auth_token: Option<String>,
    /// User id for the `X-User-Id` header.
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

/// A room reference (`_id` only) as returned by create/info endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRef {
    /// Backend-assigned room id.
    #[serde(rename = "_id")]
    pub id: String,
}

/// Response to `GET /api/v1/groups.info?roomName=<name>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfoResponse {
    /// Whether the lookup succeeded.
    #[serde(default)]
    pub success: bool,
    /// The private group, present on success.
    #[serde(default)]
    pub group: Option<RoomRef>,
}

/// One room entry in the `rooms.get` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Room name; absent for direct-message rooms.
    #[serde(default)]
    pub name: Option<String>,
}

/// Response to `GET /api/v1/rooms.get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomsGetResponse {
    /// All rooms visible to the authenticated caller.
    #[serde(default)]
    pub update: Vec<Room>,
}

/// Response to `POST /api/v1/channels.create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelCreateResponse {
    /// Whether the channel was created.
    #[serde(default)]
    pub success: bool,
    /// The created channel, present on success.
    #[serde(default)]
    pub channel: Option<RoomRef>,
    /// Error message, present on failure.
    #[serde(default)]
    pub error: Option<String>,
}

/// Generic `{success, error}` response (setType, invite, users.create,
/// users.update).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericResponse {
    /// Whether the call succeeded.
    #[serde(default)]
    pub success: bool,
    /// Error message, present on failure.
    #[serde(default)]
    pub error: Option<String>,
}

/// One user entry in the `users.list` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatUserEntry {
    /// Chat username.
    pub username: String,
}

/// Response to `GET /api/v1/users.list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersListResponse {
    /// All chat users.
    #[serde(default)]
    pub users: Vec<ChatUserEntry>,
}

/// A chat user reference (`_id` only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatUserRef {
    /// Backend-assigned user id.
    #[serde(rename = "_id")]
    pub id: String,
}

/// Response to `GET /api/v1/users.info?username=<name>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfoResponse {
    /// Whether the lookup succeeded.
    #[serde(default)]
    pub success: bool,
    /// The chat user, present on success.
    #[serde(default)]
    pub user: Option<ChatUserRef>,
}

impl GenericResponse {
    /// Error message or a placeholder when the backend sent none.
    pub fn error_message(&self) -> String {
        self.error.clone().unwrap_or_else(|| "unknown error".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_success_decodes_session() {
        let body = json!({
            "status": "success",
            "data": {"authToken": "tok", "userId": "uid"}
        });
        let response: LoginResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.status, "success");
        let data = response.data.unwrap();
        assert_eq!(data.auth_token.as_deref(), Some("tok"));
        assert_eq!(data.user_id.as_deref(), Some("uid"));
    }

    #[test]
    fn login_error_decodes_without_data() {
        let body = json!({"status": "error", "error": "Unauthorized"});
        let response: LoginResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.status, "error");
        assert!(response.data.is_none());
    }

    #[test]
    fn rooms_get_tolerates_nameless_rooms() {
        let body = json!({"update": [{"name": "CS101-Lab-A"}, {"t": "d"}]});
        let response: RoomsGetResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.update.len(), 2);
        assert_eq!(response.update[0].name.as_deref(), Some("CS101-Lab-A"));
        assert!(response.update[1].name.is_none());
    }

    #[test]
    fn channel_create_failure_carries_error() {
        let body = json!({"success": false, "error": "name already taken"});
        let response: ChannelCreateResponse = serde_json::from_value(body).unwrap();
        assert!(!response.success);
        assert!(response.channel.is_none());
        assert_eq!(response.error.as_deref(), Some("name already taken"));
    }

    #[test]
    fn group_info_maps_underscore_id() {
        let body = json!({"success": true, "group": {"_id": "room-1"}});
        let response: GroupInfoResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.group.unwrap().id, "room-1");
    }

    #[test]
    fn generic_error_message_fallback() {
        let response = GenericResponse {
            success: false,
            error: None,
        };
        assert_eq!(response.error_message(), "unknown error");
    }
}
