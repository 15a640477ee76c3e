//! Reverses a reconciliation and purges the user's credential.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use zeitfrei_oauth::UserGuard;
use zeitfrei_store::{GuildRegistry, TokenStore};
use zeitfrei_types::{GuildRoleMapping, UserId, defaults};

use crate::error::Result;
use crate::guild_api::{SharedGuildApi, bounded};
use crate::report::{DeauthReport, GuildReversal, OpStatus};

/// Revokes authorized roles, restores unauthorized ones, deletes the credential.
///
/// The credential is deleted whenever one existed, however many guild calls
/// failed. Without a stored credential nothing is called and every guild is
/// reported as skipped, so a repeated call is harmless.
#[derive(Debug, Clone)]
pub struct Deauthorizer {
    tokens: TokenStore,
    guilds: GuildRegistry,
    api: SharedGuildApi,
    max_concurrency: usize,
    timeout: Duration,
}

impl Deauthorizer {
    pub fn new(tokens: TokenStore, guilds: GuildRegistry, api: SharedGuildApi) -> Self {
        Self {
            tokens,
            guilds,
            api,
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

    pub async fn deauthorize(&self, guard: &UserGuard) -> Result<DeauthReport> {
        let user_id = guard.user_id();
        let mappings = self.guilds.list()?;

        if self.tokens.get(user_id)?.is_none() {
            info!(%user_id, "No credential stored, nothing to deauthorize");
            return Ok(DeauthReport {
                user_id,
                credential_deleted: false,
                guilds: mappings.iter().map(GuildReversal::skipped).collect(),
            });
        }

        info!(%user_id, guilds = mappings.len(), "Deauthorizing user");

        let guilds = stream::iter(
            mappings
                .iter()
                .map(|mapping| self.reverse_one(user_id, mapping))
                .collect::<Vec<_>>(),
        )
        .buffered(self.max_concurrency)
        .collect::<Vec<_>>()
        .await;

        let credential_deleted = self.tokens.delete(user_id)?;

        let report = DeauthReport {
            user_id,
            credential_deleted,
            guilds,
        };
        info!(%user_id, failed = report.failures(), "Credential deleted");
        Ok(report)
    }

    async fn reverse_one(&self, user_id: UserId, mapping: &GuildRoleMapping) -> GuildReversal {
        let guild_id = mapping.guild_id;

        let revoke: OpStatus = bounded(
            self.timeout,
            self.api
                .remove_role(guild_id, user_id, mapping.auth_role_id),
        )
        .await
        .into();

        let restore = if mapping.has_distinct_unauth_role() {
            bounded(
                self.timeout,
                self.api.add_role(guild_id, user_id, mapping.unauth_role_id),
            )
            .await
            .into()
        } else {
            OpStatus::Skipped
        };

        for (op, status) in [
            ("revoke_authorized", &revoke),
            ("restore_unauthorized", &restore),
        ] {
            if let OpStatus::Failed { error } = status {
                warn!(%user_id, %guild_id, op, %error, "Role operation failed");
            }
        }

        GuildReversal::new(mapping, revoke, restore)
    }
}
