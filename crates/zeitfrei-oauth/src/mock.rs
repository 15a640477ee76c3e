//! Scripted identity provider for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use zeitfrei_types::{TokenGrant, UserProfile};

use crate::error::ProviderError;
use crate::provider::IdentityProvider;

/// An [`IdentityProvider`] that replays queued responses.
///
/// Every call is counted. When a queue runs dry the call fails with a
/// transient error.
#[derive(Debug, Default)]
pub struct MockIdentityProvider {
    refreshes: Mutex<VecDeque<Result<TokenGrant, ProviderError>>>,
    exchanges: Mutex<VecDeque<Result<TokenGrant, ProviderError>>>,
    profiles: Mutex<VecDeque<Result<UserProfile, ProviderError>>>,
    refresh_tokens_seen: Mutex<Vec<String>>,
    calls: AtomicU32,
    delay: Mutex<Option<Duration>>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A grant with the given tokens and lifetime in seconds.
    pub fn grant(access_token: &str, refresh_token: &str, expires_in: i64) -> TokenGrant {
        TokenGrant {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_in,
            token_type: "Bearer".to_string(),
            scope: "identify guilds.join".to_string(),
        }
    }

    pub fn push_refresh(&self, result: Result<TokenGrant, ProviderError>) -> &Self {
        self.refreshes.lock().push_back(result);
        self
    }

    pub fn push_exchange(&self, result: Result<TokenGrant, ProviderError>) -> &Self {
        self.exchanges.lock().push_back(result);
        self
    }

    pub fn push_profile(&self, result: Result<UserProfile, ProviderError>) -> &Self {
        self.profiles.lock().push_back(result);
        self
    }

    /// Delay every call, for exercising timeouts.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    /// Total number of provider calls made.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Refresh tokens presented, in call order.
    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.refresh_tokens_seen.lock().clone()
    }

    async fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn exhausted<T>(what: &str) -> Result<T, ProviderError> {
    Err(ProviderError::Transient(format!("mock: no {} response queued", what)))
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError> {
        self.refresh_tokens_seen.lock().push(refresh_token.to_string());
        self.record().await;
        let next = self.refreshes.lock().pop_front();
        next.unwrap_or_else(|| exhausted("refresh"))
    }

    async fn exchange_code(&self, _code: &str) -> Result<TokenGrant, ProviderError> {
        self.record().await;
        let next = self.exchanges.lock().pop_front();
        next.unwrap_or_else(|| exhausted("exchange"))
    }

    async fn current_user(&self, _access_token: &str) -> Result<UserProfile, ProviderError> {
        self.record().await;
        let next = self.profiles.lock().pop_front();
        next.unwrap_or_else(|| exhausted("profile"))
    }
}
