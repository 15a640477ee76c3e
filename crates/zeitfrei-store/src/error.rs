//! Error types for the store crate.

use thiserror::Error;
use zeitfrei_types::{GuildId, RoleId};

/// Errors that can occur in the store crate.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection or statement failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Schema migration failed.
    #[error("Migration error: {0}")]
    Migration(String),

    /// The exact (guild, unauthorized role, authorized role) triple is already registered.
    #[error("mapping already registered: guild {guild_id}, roles {unauth_role_id} -> {auth_role_id}")]
    DuplicateMapping {
        guild_id: GuildId,
        unauth_role_id: RoleId,
        auth_role_id: RoleId,
    },

    /// No mapping with that triple exists.
    #[error("mapping not found: guild {guild_id}, roles {unauth_role_id} -> {auth_role_id}")]
    MappingNotFound {
        guild_id: GuildId,
        unauth_role_id: RoleId,
        auth_role_id: RoleId,
    },
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
