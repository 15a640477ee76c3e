//! Applies the authorized role across every registered guild.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use zeitfrei_oauth::UserGuard;
use zeitfrei_store::GuildRegistry;
use zeitfrei_types::{GuildId, GuildRoleMapping, UserCredential, UserId, defaults};

use crate::error::Result;
use crate::guild_api::{SharedGuildApi, bounded};
use crate::report::{GuildGrant, JoinOutcome, OpStatus, ReconcileReport};

/// Grants authorized roles for a user with a fresh access token.
///
/// Holds no state of its own: the registry is read on every call. Guilds are
/// processed concurrently up to `max_concurrency`, and the report keeps
/// registry order.
#[derive(Debug, Clone)]
pub struct RoleReconciler {
    guilds: GuildRegistry,
    api: SharedGuildApi,
    home_guild_id: GuildId,
    max_concurrency: usize,
    timeout: Duration,
}

impl RoleReconciler {
    pub fn new(guilds: GuildRegistry, api: SharedGuildApi, home_guild_id: GuildId) -> Self {
        Self {
            guilds,
            api,
            home_guild_id,
            max_concurrency: defaults::MAX_CONCURRENCY,
            timeout: defaults::request_timeout(),
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Join the home guild and swap roles in every registered guild.
    ///
    /// `credential` must be the guarded user's and already fresh. Per-guild
    /// failures are recorded in the report; only a registry read failure is
    /// returned as an error.
    pub async fn grant_authorized(
        &self,
        guard: &UserGuard,
        credential: &UserCredential,
    ) -> Result<ReconcileReport> {
        let user_id = guard.user_id();
        debug_assert_eq!(user_id, credential.user_id);

        let mappings = self.guilds.list()?;
        info!(%user_id, guilds = mappings.len(), "Reconciling authorized roles");

        let join = bounded(
            self.timeout,
            self.api
                .add_member(self.home_guild_id, user_id, &credential.access_token),
        );
        let grants = stream::iter(
            mappings
                .iter()
                .map(|mapping| self.grant_one(user_id, mapping))
                .collect::<Vec<_>>(),
        )
        .buffered(self.max_concurrency)
        .collect::<Vec<_>>();

        let (join, guilds) = tokio::join!(join, grants);

        let join = JoinOutcome::from(join);
        if let JoinOutcome::Failed { error } = &join {
            warn!(%user_id, guild_id = %self.home_guild_id, %error, "Failed to add user to home guild");
        }

        let report = ReconcileReport {
            user_id,
            home_guild_id: self.home_guild_id,
            join,
            guilds,
        };
        info!(
            %user_id,
            guilds = report.guilds.len(),
            failed = report.failed_guilds().count(),
            "Reconciliation complete"
        );
        Ok(report)
    }

    async fn grant_one(&self, user_id: UserId, mapping: &GuildRoleMapping) -> GuildGrant {
        let guild_id = mapping.guild_id;

        let grant: OpStatus = bounded(
            self.timeout,
            self.api.add_role(guild_id, user_id, mapping.auth_role_id),
        )
        .await
        .into();

        // Attempted regardless of the grant; only @everyone is skipped.
        let revoke = if !mapping.has_distinct_unauth_role() {
            OpStatus::Skipped
        } else {
            bounded(
                self.timeout,
                self.api
                    .remove_role(guild_id, user_id, mapping.unauth_role_id),
            )
            .await
            .into()
        };

        for (op, status) in [("grant", &grant), ("revoke", &revoke)] {
            if let OpStatus::Failed { error } = status {
                warn!(%user_id, %guild_id, op, %error, "Role operation failed");
            }
        }

        GuildGrant::new(mapping, grant, revoke)
    }
}
