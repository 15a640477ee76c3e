//! Recording guild API for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use zeitfrei_types::{GuildId, RoleId, UserId};

use crate::error::GuildApiError;
use crate::guild_api::{GuildApi, JoinStatus};

/// One call observed by [`MockGuildApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildCall {
    AddRole { guild_id: GuildId, user_id: UserId, role_id: RoleId },
    RemoveRole { guild_id: GuildId, user_id: UserId, role_id: RoleId },
    AddMember { guild_id: GuildId, user_id: UserId },
}

impl GuildCall {
    pub fn guild_id(&self) -> GuildId {
        match self {
            GuildCall::AddRole { guild_id, .. }
            | GuildCall::RemoveRole { guild_id, .. }
            | GuildCall::AddMember { guild_id, .. } => *guild_id,
        }
    }

    pub fn is_role_mutation(&self) -> bool {
        !matches!(self, GuildCall::AddMember { .. })
    }
}

/// A [`GuildApi`] that records every call and succeeds unless told otherwise.
///
/// Failures are injected per guild and per operation kind.
#[derive(Debug, Default)]
pub struct MockGuildApi {
    calls: Mutex<Vec<GuildCall>>,
    fail_add_role: Mutex<HashSet<GuildId>>,
    fail_remove_role: Mutex<HashSet<GuildId>>,
    fail_join: Mutex<bool>,
    members: Mutex<HashSet<(GuildId, UserId)>>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockGuildApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `add_role` in `guild_id` fail with 403.
    pub fn fail_add_role(&self, guild_id: GuildId) -> &Self {
        self.fail_add_role.lock().insert(guild_id);
        self
    }

    /// Make every `remove_role` in `guild_id` fail with 403.
    pub fn fail_remove_role(&self, guild_id: GuildId) -> &Self {
        self.fail_remove_role.lock().insert(guild_id);
        self
    }

    pub fn fail_join(&self) -> &Self {
        *self.fail_join.lock() = true;
        self
    }

    /// Delay every call, for exercising timeouts.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<GuildCall> {
        self.calls.lock().clone()
    }

    pub fn role_mutations(&self) -> usize {
        self.calls.lock().iter().filter(|c| c.is_role_mutation()).count()
    }

    /// Highest number of calls observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn record(&self, call: GuildCall) {
        self.calls.lock().push(call);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn forbidden() -> GuildApiError {
    GuildApiError::Status {
        status: 403,
        body: "{\"message\": \"Missing Permissions\", \"code\": 50013}".to_string(),
    }
}

#[async_trait]
impl GuildApi for MockGuildApi {
    async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<(), GuildApiError> {
        self.record(GuildCall::AddRole { guild_id, user_id, role_id }).await;
        if self.fail_add_role.lock().contains(&guild_id) {
            return Err(forbidden());
        }
        Ok(())
    }

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<(), GuildApiError> {
        self.record(GuildCall::RemoveRole { guild_id, user_id, role_id }).await;
        if self.fail_remove_role.lock().contains(&guild_id) {
            return Err(forbidden());
        }
        Ok(())
    }

    async fn add_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        _access_token: &str,
    ) -> Result<JoinStatus, GuildApiError> {
        self.record(GuildCall::AddMember { guild_id, user_id }).await;
        if *self.fail_join.lock() {
            return Err(forbidden());
        }
        if self.members.lock().insert((guild_id, user_id)) {
            Ok(JoinStatus::Joined)
        } else {
            Ok(JoinStatus::AlreadyMember)
        }
    }
}
