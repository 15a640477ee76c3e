//! Per-guild results of role reconciliation and its reversal.

use serde::Serialize;
use zeitfrei_types::{GuildId, GuildRoleMapping, RoleId, UserId};

use crate::error::GuildApiError;
use crate::guild_api::JoinStatus;

/// Result of one role operation in one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OpStatus {
    Succeeded,
    Failed { error: String },
    /// Not attempted: nothing to do, or a prerequisite failed.
    Skipped,
}

impl OpStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, OpStatus::Failed { .. })
    }
}

impl From<Result<(), GuildApiError>> for OpStatus {
    fn from(result: Result<(), GuildApiError>) -> Self {
        match result {
            Ok(()) => OpStatus::Succeeded,
            Err(e) => OpStatus::Failed { error: e.to_string() },
        }
    }
}

/// Result of adding the user to the home guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
    Failed { error: String },
}

impl From<Result<JoinStatus, GuildApiError>> for JoinOutcome {
    fn from(result: Result<JoinStatus, GuildApiError>) -> Self {
        match result {
            Ok(JoinStatus::Joined) => JoinOutcome::Joined,
            Ok(JoinStatus::AlreadyMember) => JoinOutcome::AlreadyMember,
            Err(e) => JoinOutcome::Failed { error: e.to_string() },
        }
    }
}

/// Role swap for one mapping: authorized role granted, unauthorized revoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuildGrant {
    pub guild_id: GuildId,
    pub unauth_role_id: RoleId,
    pub auth_role_id: RoleId,
    pub grant: OpStatus,
    pub revoke: OpStatus,
}

impl GuildGrant {
    pub(crate) fn new(mapping: &GuildRoleMapping, grant: OpStatus, revoke: OpStatus) -> Self {
        Self {
            guild_id: mapping.guild_id,
            unauth_role_id: mapping.unauth_role_id,
            auth_role_id: mapping.auth_role_id,
            grant,
            revoke,
        }
    }
}

/// Output of [`RoleReconciler::grant_authorized`](crate::RoleReconciler::grant_authorized).
///
/// `guilds` holds one entry per registered mapping, in registry order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub user_id: UserId,
    pub home_guild_id: GuildId,
    pub join: JoinOutcome,
    pub guilds: Vec<GuildGrant>,
}

impl ReconcileReport {
    /// True when every attempted role operation succeeded.
    ///
    /// A failed home-guild join is not counted; it does not block role
    /// operations in guilds the user already belongs to.
    pub fn is_complete(&self) -> bool {
        self.failed_guilds().next().is_none()
    }

    /// Mappings with at least one failed operation.
    pub fn failed_guilds(&self) -> impl Iterator<Item = &GuildGrant> {
        self.guilds
            .iter()
            .filter(|g| g.grant.is_failed() || g.revoke.is_failed())
    }
}

/// Reversal for one mapping: authorized role revoked, unauthorized restored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuildReversal {
    pub guild_id: GuildId,
    pub unauth_role_id: RoleId,
    pub auth_role_id: RoleId,
    pub revoke_authorized: OpStatus,
    pub restore_unauthorized: OpStatus,
}

impl GuildReversal {
    pub(crate) fn new(mapping: &GuildRoleMapping, revoke_authorized: OpStatus, restore_unauthorized: OpStatus) -> Self {
        Self {
            guild_id: mapping.guild_id,
            unauth_role_id: mapping.unauth_role_id,
            auth_role_id: mapping.auth_role_id,
            revoke_authorized,
            restore_unauthorized,
        }
    }

    pub(crate) fn skipped(mapping: &GuildRoleMapping) -> Self {
        Self::new(mapping, OpStatus::Skipped, OpStatus::Skipped)
    }
}

/// Output of [`Deauthorizer::deauthorize`](crate::Deauthorizer::deauthorize).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeauthReport {
    pub user_id: UserId,
    /// Whether a stored credential was found and deleted.
    pub credential_deleted: bool,
    pub guilds: Vec<GuildReversal>,
}

impl DeauthReport {
    pub fn failures(&self) -> usize {
        self.guilds
            .iter()
            .filter(|g| g.revoke_authorized.is_failed() || g.restore_unauthorized.is_failed())
            .count()
    }
}
