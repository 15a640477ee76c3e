//! Keeps stored access tokens usable.
//!
//! [`TokenRefresher::ensure_fresh`] is the only place a credential's token
//! pair changes after login. It separates three failure shapes the callers
//! must treat differently:
//!
//! - the user is unknown: nothing to do
//! - the provider refused the refresh token: the user revoked the app
//! - anything else (network, timeout, 5xx): retry later, state untouched

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use zeitfrei_store::TokenStore;
use zeitfrei_types::{UserCredential, defaults};

use crate::error::{ProviderError, Result};
use crate::locks::UserGuard;
use crate::provider::SharedIdentityProvider;

/// Result of [`TokenRefresher::ensure_fresh`].
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// No credential is stored for the user.
    NoSuchUser,
    /// The stored token has not expired; no provider call was made.
    AlreadyFresh(UserCredential),
    /// The token was refreshed and the new pair persisted.
    Refreshed(UserCredential),
    /// The provider permanently rejected the refresh token. The stored
    /// credential is unchanged; the caller decides whether to purge it.
    Revoked {
        credential: UserCredential,
        reason: String,
    },
    /// The refresh could not be completed. Nothing was mutated.
    TransientError(String),
}

impl RefreshOutcome {
    /// The usable credential, when the outcome allows proceeding.
    pub fn fresh_credential(&self) -> Option<&UserCredential> {
        match self {
            RefreshOutcome::AlreadyFresh(cred) | RefreshOutcome::Refreshed(cred) => Some(cred),
            _ => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh_credential().is_some()
    }

    /// Short label for logs and API responses.
    pub fn label(&self) -> &'static str {
        match self {
            RefreshOutcome::NoSuchUser => "no_such_user",
            RefreshOutcome::AlreadyFresh(_) => "already_fresh",
            RefreshOutcome::Refreshed(_) => "refreshed",
            RefreshOutcome::Revoked { .. } => "revoked",
            RefreshOutcome::TransientError(_) => "transient_error",
        }
    }
}

/// Refreshes expired access tokens against the identity provider.
#[derive(Debug, Clone)]
pub struct TokenRefresher {
    store: TokenStore,
    provider: SharedIdentityProvider,
    timeout: Duration,
}

impl TokenRefresher {
    pub fn new(store: TokenStore, provider: SharedIdentityProvider) -> Self {
        Self {
            store,
            provider,
            timeout: defaults::request_timeout(),
        }
    }

    /// Bound on a single provider call, independent of the transport's own timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Make sure the guarded user's access token is valid now.
    ///
    /// Storage failures are returned as errors; every provider failure is
    /// folded into the outcome.
    pub async fn ensure_fresh(&self, guard: &UserGuard) -> Result<RefreshOutcome> {
        let user_id = guard.user_id();

        let Some(mut credential) = self.store.get(user_id)? else {
            debug!(%user_id, "No credential stored");
            return Ok(RefreshOutcome::NoSuchUser);
        };

        if !credential.is_stale_at(Utc::now()) {
            debug!(%user_id, expires_at = %credential.expires_at, "Access token still valid");
            return Ok(RefreshOutcome::AlreadyFresh(credential));
        }

        info!(%user_id, "Access token expired, refreshing");

        let refreshed = tokio::time::timeout(
            self.timeout,
            self.provider.refresh(&credential.refresh_token),
        )
        .await
        .unwrap_or_else(|_| {
            Err(ProviderError::Transient(format!(
                "Token refresh timed out after {:?}",
                self.timeout
            )))
        });

        let grant = match refreshed {
            Ok(grant) => grant,
            Err(ProviderError::Rejected { status, body }) => {
                warn!(%user_id, status, "Refresh token rejected, authorization revoked");
                return Ok(RefreshOutcome::Revoked {
                    credential,
                    reason: format!("HTTP {}: {}", status, body),
                });
            }
            Err(ProviderError::Transient(reason)) => {
                warn!(%user_id, %reason, "Token refresh failed, will retry later");
                return Ok(RefreshOutcome::TransientError(reason));
            }
        };

        credential.apply_grant(&grant, Utc::now());

        let updated = self.store.update_tokens(
            user_id,
            &credential.access_token,
            &credential.refresh_token,
            credential.expires_at,
        )?;
        if !updated {
            warn!(%user_id, "Credential removed during refresh");
            return Ok(RefreshOutcome::NoSuchUser);
        }

        info!(%user_id, expires_at = %credential.expires_at, "Token refreshed successfully");
        Ok(RefreshOutcome::Refreshed(credential))
    }
}
