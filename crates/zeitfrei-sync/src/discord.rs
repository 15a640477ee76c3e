//! Discord guild member endpoints, authenticated with the bot token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use zeitfrei_types::{GuildId, RoleId, UserId, defaults};

use crate::error::GuildApiError;
use crate::guild_api::{GuildApi, JoinStatus};

/// [`GuildApi`] backed by Discord's REST API.
#[derive(Clone)]
pub struct DiscordGuildClient {
    http: reqwest::Client,
    bot_token: String,
    api_base: String,
    timeout: Duration,
}

impl DiscordGuildClient {
    pub fn new(http: reqwest::Client, bot_token: impl Into<String>) -> Self {
        Self {
            http,
            bot_token: bot_token.into(),
            api_base: defaults::DISCORD_API_BASE.to_string(),
            timeout: defaults::request_timeout(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn member_url(&self, guild_id: GuildId, user_id: UserId) -> String {
        format!(
            "{}/guilds/{}/members/{}",
            self.api_base.trim_end_matches('/'),
            guild_id,
            user_id
        )
    }

    fn role_url(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> String {
        format!("{}/roles/{}", self.member_url(guild_id, user_id), role_id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Bot {}", self.bot_token))
            .timeout(self.timeout)
    }

    async fn send(&self, request: RequestBuilder) -> Result<StatusCode, GuildApiError> {
        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() {
                GuildApiError::Timeout(self.timeout)
            } else {
                GuildApiError::from(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(status);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(GuildApiError::from_status(status, body))
    }
}

impl std::fmt::Debug for DiscordGuildClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordGuildClient")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GuildApi for DiscordGuildClient {
    async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<(), GuildApiError> {
        tracing::debug!(%guild_id, %user_id, %role_id, "Granting role");
        self.send(self.http.put(self.role_url(guild_id, user_id, role_id)))
            .await
            .map(|_| ())
    }

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<(), GuildApiError> {
        tracing::debug!(%guild_id, %user_id, %role_id, "Revoking role");
        self.send(self.http.delete(self.role_url(guild_id, user_id, role_id)))
            .await
            .map(|_| ())
    }

    async fn add_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        access_token: &str,
    ) -> Result<JoinStatus, GuildApiError> {
        tracing::debug!(%guild_id, %user_id, "Adding member");
        let request = self
            .http
            .put(self.member_url(guild_id, user_id))
            .json(&serde_json::json!({ "access_token": access_token }));

        match self.send(request).await? {
            StatusCode::NO_CONTENT => Ok(JoinStatus::AlreadyMember),
            _ => Ok(JoinStatus::Joined),
        }
    }
}
