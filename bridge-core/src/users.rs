//! User management: one chat account per enrolled LMS user.

use crate::api::{self, GenericResponse, UserInfoResponse, UsersListResponse};
use crate::client::AuthClient;
use crate::error::{BridgeError, Result};
use crate::storage::{RosterStore, RosterUser};
use crate::sync::{codes, SyncErrorEntry};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;

/// Chat username for an LMS user: the email local-part when the email
/// contains `@`, otherwise the raw LMS username.
pub fn derive_username(user: &RosterUser) -> String {
    match user.email.split_once('@') {
        Some((local, _)) => local.to_string(),
        None => user.username.clone(),
    }
}

/// Throwaway password for a provisioned chat account.
///
/// Not security-critical: real logins go through the separately linked
/// LMS account, this only satisfies the creation endpoint.
fn random_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}

/// Manager that mirrors course enrolments into chat accounts.
pub struct UserSync<'a> {
    client: &'a AuthClient,
    roster: &'a dyn RosterStore,
    errors: Vec<SyncErrorEntry>,
}

impl<'a> UserSync<'a> {
    /// Create a manager bound to one authenticated client.
    pub fn new(client: &'a AuthClient, roster: &'a dyn RosterStore) -> Self {
        Self {
            client,
            roster,
            errors: Vec::new(),
        }
    }

    /// Drain the errors collected so far.
    pub fn take_errors(&mut self) -> Vec<SyncErrorEntry> {
        std::mem::take(&mut self.errors)
    }

    /// Ensure a chat account exists for every user enrolled in the course.
    /// Remote failures are collected, not returned.
    pub async fn create_users_for_course(&mut self, course_id: i64) -> Result<()> {
        let users = self.roster.enrolled_users(course_id).await?;

        for user in users {
            if self.user_exists(&user).await {
                continue;
            }
            self.create_user(&user).await;
        }

        Ok(())
    }

    /// Linear scan over the full user listing, fetched fresh for every
    /// candidate. Exact match on the derived username.
    pub async fn user_exists(&self, user: &RosterUser) -> bool {
        let username = derive_username(user);
        self.existing_usernames()
            .await
            .iter()
            .any(|existing| existing == &username)
    }

    async fn existing_usernames(&self) -> Vec<String> {
        let value = match self.client.get(api::paths::USERS_LIST).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("user listing failed: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_value::<UsersListResponse>(value) {
            Ok(response) => response.users.into_iter().map(|u| u.username).collect(),
            Err(e) => {
                tracing::warn!("user listing malformed: {}", e);
                Vec::new()
            }
        }
    }

    /// Create one chat account. A failure appends a `user_creation` entry
    /// annotated with the LMS user id and email.
    pub async fn create_user(&mut self, user: &RosterUser) {
        let body = json!({
            "name": format!("{} {}", user.first_name, user.last_name),
            "username": derive_username(user),
            "email": user.email,
            "verified": true,
            "password": random_password(),
            "joinDefaultChannels": false,
        });

        let result = self
            .client
            .post(api::paths::USERS_CREATE, body)
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
            codes::USER_CREATION,
            format!("[ user_id - {} | email - {} ] {}", user.id, user.email, detail),
        ));
    }

    /// Direct chat user lookup by derived username.
    pub async fn get_user(&self, user: &RosterUser) -> Option<String> {
        let path = format!("{}?username={}", api::paths::USERS_INFO, derive_username(user));

        let value = match self.client.get(&path).await {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("user lookup for {:?} failed: {}", user.username, e);
                return None;
            }
        };

        match serde_json::from_value::<UserInfoResponse>(value) {
            Ok(response) if response.success => response.user.map(|u| u.id),
            _ => None,
        }
    }

    /// Mirror an enrolment's status onto the chat account's active flag.
    ///
    /// Status `1` means the enrolment is suspended and the chat account is
    /// deactivated; every other status activates it. Silently does nothing
    /// when the chat user does not exist.
    pub async fn update_user_activity(&self, enrolment_id: i64) -> Result<()> {
        let enrolment = self
            .roster
            .enrolment(enrolment_id)
            .await?
            .ok_or(BridgeError::NotFound {
                kind: "enrolment",
                id: enrolment_id,
            })?;

        let user = self
            .roster
            .user(enrolment.user_id)
            .await?
            .ok_or(BridgeError::NotFound {
                kind: "user",
                id: enrolment.user_id,
            })?;

        let is_active = enrolment.status != 1;

        let Some(chat_user_id) = self.get_user(&user).await else {
            return Ok(());
        };

        let body = json!({ "userId": chat_user_id, "active": is_active });
        if let Err(e) = self.client.post(api::paths::USERS_UPDATE, body).await {
            tracing::warn!("activity update for {:?} failed: {}", user.username, e);
        }

        Ok(())
    }
}
