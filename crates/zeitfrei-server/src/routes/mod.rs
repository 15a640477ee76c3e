//! HTTP route handlers.

mod callback;
mod guilds;
mod health;
mod users;

pub use callback::callback_handler;
pub use guilds::{
    add_guild_handler, delete_guild_handler, get_auth_role_data_handler, get_guild_auth_role_data_handler,
};
pub use health::{HealthResponse, health, health_routes};
pub use users::{
    EnsureQuery, add_user_to_server_handler, all_users_handler, delete_user_handler, get_user_handler,
};

use std::str::FromStr;

use crate::error::ServerError;

/// Parse an id taken from a path segment.
pub(crate) fn parse_id<T>(raw: &str, what: &str) -> Result<T, ServerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ServerError::BadRequest(format!("Invalid {}: {}", what, e)))
}
