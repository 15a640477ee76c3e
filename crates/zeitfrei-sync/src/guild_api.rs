//! Guild management boundary.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use zeitfrei_types::{GuildId, RoleId, UserId};

use crate::error::GuildApiError;

/// Result of adding a user to a guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStatus {
    Joined,
    AlreadyMember,
}

/// Role and membership operations on Discord guilds.
///
/// Every call reports success or failure on its own; callers aggregate.
#[async_trait]
pub trait GuildApi: Send + Sync + std::fmt::Debug {
    /// Grant `role_id` to a guild member.
    async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<(), GuildApiError>;

    /// Remove `role_id` from a guild member.
    async fn remove_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId)
    -> Result<(), GuildApiError>;

    /// Add the user to a guild, using their access token as consent.
    async fn add_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        access_token: &str,
    ) -> Result<JoinStatus, GuildApiError>;
}

/// Shared guild API for use across async contexts.
pub type SharedGuildApi = Arc<dyn GuildApi>;

/// Run one guild call under `timeout`, mapping expiry to [`GuildApiError::Timeout`].
pub(crate) async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, GuildApiError>>,
) -> Result<T, GuildApiError> {
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(GuildApiError::Timeout(timeout)))
}
