//! Identity provider boundary.

use std::sync::Arc;

use async_trait::async_trait;
use zeitfrei_types::{TokenGrant, UserProfile};

use crate::error::ProviderError;

/// The OAuth2 identity provider the gatekeeper delegates to.
///
/// Implementations classify every failure as [`ProviderError::Rejected`]
/// (permanent) or [`ProviderError::Transient`] (retryable).
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Exchange a refresh token for a new grant (`grant_type=refresh_token`).
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError>;

    /// Exchange an authorization code (`grant_type=authorization_code`).
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError>;

    /// Fetch the profile of the user owning `access_token`.
    async fn current_user(&self, access_token: &str) -> Result<UserProfile, ProviderError>;
}

/// Shared identity provider for use across async contexts.
pub type SharedIdentityProvider = Arc<dyn IdentityProvider>;
