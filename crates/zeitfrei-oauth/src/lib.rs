//! Discord OAuth2 token lifecycle.
//!
//! # Components
//!
//! - [`provider`]: the identity provider boundary and its error taxonomy
//! - [`discord`]: reqwest implementation against Discord's OAuth2 endpoints
//! - [`locks`]: per-user mutual exclusion for check-then-mutate sequences
//! - [`refresher`]: keeps a stored access token usable, detecting revocation
//! - [`mock`]: scripted provider for tests

pub mod discord;
pub mod error;
pub mod locks;
pub mod mock;
pub mod provider;
pub mod refresher;

pub use discord::{DiscordOAuthClient, DiscordOAuthConfig};
pub use error::{OAuthError, ProviderError, Result};
pub use locks::{UserGuard, UserLocks};
pub use mock::MockIdentityProvider;
pub use provider::{IdentityProvider, SharedIdentityProvider};
pub use refresher::{RefreshOutcome, TokenRefresher};
