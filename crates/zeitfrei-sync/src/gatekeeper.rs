//! Entry points used by the HTTP surface.
//!
//! Every operation takes the user's lock first, so refresh, reconciliation
//! and deletion for one user never interleave.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use zeitfrei_oauth::{
    ProviderError, RefreshOutcome, SharedIdentityProvider, TokenRefresher, UserGuard, UserLocks,
};
use zeitfrei_store::{Database, GuildRegistry, TokenStore};
use zeitfrei_types::{GuildId, UserCredential, UserId, defaults};

use crate::deauth::Deauthorizer;
use crate::error::Result;
use crate::guild_api::SharedGuildApi;
use crate::notify::{LogNotifier, RevocationNotice, SharedNotifier};
use crate::reconciler::RoleReconciler;
use crate::report::{DeauthReport, ReconcileReport};

/// Tuning shared by the refresher, reconciler and deauthorizer.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub home_guild_id: GuildId,
    pub max_concurrency: usize,
    /// Bound on each provider and guild API call.
    pub request_timeout: Duration,
}

impl SyncOptions {
    pub fn new(home_guild_id: GuildId) -> Self {
        Self {
            home_guild_id,
            max_concurrency: defaults::MAX_CONCURRENCY,
            request_timeout: defaults::request_timeout(),
        }
    }
}

/// Result of [`Gatekeeper::ensure_member`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EnsureOutcome {
    NoSuchUser,
    /// Token refresh could not complete; nothing changed.
    Transient { reason: String },
    /// The user revoked the application and has been deauthorized.
    Revoked { reason: String, report: DeauthReport },
    Reconciled {
        /// Whether the access token had to be refreshed first.
        refreshed: bool,
        report: ReconcileReport,
    },
}

/// Result of [`Gatekeeper::check_user`].
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    NoSuchUser,
    Transient { reason: String },
    Revoked { reason: String, report: DeauthReport },
    Fresh { credential: UserCredential, refreshed: bool },
}

/// Composes token refresh, role reconciliation and deauthorization under a
/// per-user lock.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    locks: UserLocks,
    tokens: TokenStore,
    guilds: GuildRegistry,
    provider: SharedIdentityProvider,
    refresher: TokenRefresher,
    reconciler: RoleReconciler,
    deauthorizer: Deauthorizer,
    notifier: SharedNotifier,
    timeout: Duration,
}

impl Gatekeeper {
    pub fn new(db: Database, provider: SharedIdentityProvider, guild_api: SharedGuildApi, options: SyncOptions) -> Self {
        let tokens = TokenStore::new(db.clone());
        let guilds = GuildRegistry::new(db);

        let refresher =
            TokenRefresher::new(tokens.clone(), provider.clone()).with_timeout(options.request_timeout);
        let reconciler = RoleReconciler::new(guilds.clone(), guild_api.clone(), options.home_guild_id)
            .with_max_concurrency(options.max_concurrency)
            .with_timeout(options.request_timeout);
        let deauthorizer = Deauthorizer::new(tokens.clone(), guilds.clone(), guild_api)
            .with_max_concurrency(options.max_concurrency)
            .with_timeout(options.request_timeout);

        Self {
            locks: UserLocks::new(),
            tokens,
            guilds,
            provider,
            refresher,
            reconciler,
            deauthorizer,
            notifier: std::sync::Arc::new(LogNotifier),
            timeout: options.request_timeout,
        }
    }

    pub fn with_notifier(mut self, notifier: SharedNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn guilds(&self) -> &GuildRegistry {
        &self.guilds
    }

    /// Refresh the user's token if needed, then grant authorized roles.
    pub async fn ensure_member(&self, user_id: UserId) -> Result<EnsureOutcome> {
        let guard = self.locks.lock(user_id).await;
        self.ensure_member_locked(&guard).await
    }

    /// Liveness check: refresh if needed and return the credential, without
    /// touching roles unless the user turns out to be revoked.
    pub async fn check_user(&self, user_id: UserId) -> Result<CheckOutcome> {
        let guard = self.locks.lock(user_id).await;

        let outcome = match self.refresher.ensure_fresh(&guard).await? {
            RefreshOutcome::NoSuchUser => CheckOutcome::NoSuchUser,
            RefreshOutcome::TransientError(reason) => CheckOutcome::Transient { reason },
            RefreshOutcome::Revoked { credential, reason } => {
                let report = self.handle_revoked(&guard, &credential, &reason).await?;
                CheckOutcome::Revoked { reason, report }
            }
            RefreshOutcome::AlreadyFresh(credential) => CheckOutcome::Fresh {
                credential,
                refreshed: false,
            },
            RefreshOutcome::Refreshed(credential) => CheckOutcome::Fresh {
                credential,
                refreshed: true,
            },
        };
        Ok(outcome)
    }

    /// Reverse the user's roles and delete their credential.
    pub async fn remove_user(&self, user_id: UserId) -> Result<DeauthReport> {
        let guard = self.locks.lock(user_id).await;
        self.deauthorizer.deauthorize(&guard).await
    }

    /// Complete an OAuth login: exchange the code, store the credential, and
    /// reconcile the new user.
    ///
    /// A rejected or failed exchange is returned as
    /// [`SyncError::Provider`](crate::SyncError::Provider).
    pub async fn register_user(&self, code: &str) -> Result<EnsureOutcome> {
        let grant = self
            .bounded(self.provider.exchange_code(code), "Authorization code exchange")
            .await?;
        let profile = self
            .bounded(self.provider.current_user(&grant.access_token), "Profile fetch")
            .await?;

        let guard = self.locks.lock(profile.id).await;
        let credential = UserCredential::from_grant(&profile, &grant, Utc::now());
        self.tokens.upsert(&credential)?;
        info!(user_id = %profile.id, username = %profile.username, "User authorized");

        self.ensure_member_locked(&guard).await
    }

    async fn ensure_member_locked(&self, guard: &UserGuard) -> Result<EnsureOutcome> {
        let (credential, refreshed) = match self.refresher.ensure_fresh(guard).await? {
            RefreshOutcome::NoSuchUser => return Ok(EnsureOutcome::NoSuchUser),
            RefreshOutcome::TransientError(reason) => return Ok(EnsureOutcome::Transient { reason }),
            RefreshOutcome::Revoked { credential, reason } => {
                let report = self.handle_revoked(guard, &credential, &reason).await?;
                return Ok(EnsureOutcome::Revoked { reason, report });
            }
            RefreshOutcome::AlreadyFresh(credential) => (credential, false),
            RefreshOutcome::Refreshed(credential) => (credential, true),
        };

        let report = self.reconciler.grant_authorized(guard, &credential).await?;
        Ok(EnsureOutcome::Reconciled { refreshed, report })
    }

    async fn handle_revoked(
        &self,
        guard: &UserGuard,
        credential: &UserCredential,
        reason: &str,
    ) -> Result<DeauthReport> {
        let report = self.deauthorizer.deauthorize(guard).await?;

        let notice = RevocationNotice {
            user_id: credential.user_id,
            username: credential.username.clone(),
            reason: reason.to_string(),
            report: report.clone(),
            at: Utc::now(),
        };
        if let Err(e) = self.notifier.notify_revoked(&notice).await {
            warn!(user_id = %credential.user_id, error = %e, "Failed to send revocation notice");
        }

        Ok(report)
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = std::result::Result<T, ProviderError>>,
        what: &str,
    ) -> std::result::Result<T, ProviderError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or_else(|_| Err(ProviderError::Transient(format!("{} timed out after {:?}", what, self.timeout))))
    }
}
