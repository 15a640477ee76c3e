//! SQLite persistence for the zeitfrei gatekeeper.
//!
//! One database file holds two independent tables:
//!
//! - `users`: [`TokenStore`], one OAuth credential row per Discord user
//! - `guild`: [`GuildRegistry`], unauthorized → authorized role pairs per guild
//!
//! Both stores share a [`Database`] handle. Calls are synchronous and short;
//! the connection is serialized behind a mutex.

pub mod db;
pub mod error;
pub mod guilds;
pub mod tokens;

pub use db::Database;
pub use error::{Result, StoreError};
pub use guilds::GuildRegistry;
pub use tokens::TokenStore;
