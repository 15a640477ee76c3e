//! Shared types for the zeitfrei OAuth gatekeeper.
//!
//! - [`ids`]: Discord snowflake newtypes
//! - [`credential`]: a user's stored OAuth credentials
//! - [`mapping`]: a guild's unauthorized → authorized role pair
//! - [`wire`]: the timestamp format subscriber bots parse

pub mod credential;
pub mod ids;
pub mod mapping;
pub mod wire;

pub use credential::{TokenGrant, UserCredential, UserProfile};
pub use ids::{GuildId, ParseIdError, RoleId, UserId};
pub use mapping::GuildRoleMapping;

/// Shared defaults.
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_PORT: u16 = 2094;
    pub const DEFAULT_BIND: &str = "127.0.0.1";
    pub const DEFAULT_DATABASE_PATH: &str = "users.db";
    pub const DISCORD_API_BASE: &str = "https://discord.com/api";
    pub const DEFAULT_SCOPES: &str = "identify guilds guilds.join email";
    /// Upper bound on concurrent per-guild role calls.
    pub const MAX_CONCURRENCY: usize = 4;
    pub const REQUEST_TIMEOUT_SECS: u64 = 10;
    /// Re-authorization interval recorded for a mapping when the caller omits it.
    pub const REAUTH_DAYS: u32 = 30;

    pub fn request_timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}
