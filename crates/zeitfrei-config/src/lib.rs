//! Configuration for the zeitfrei gatekeeper.
//!
//! A single TOML file (`zeitfrei.toml`) with optional sections:
//! - `[server]`, `[database]`, `[discord]`, `[sync]`, `[notify]`
//! - `[[bots]]`: subscriber bot identities and their API keys
//!
//! Secrets resolve from the environment first and fall back to the file
//! with a plaintext warning.

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{LoadedConfig, load_config, load_config_file, user_config_path};
pub use error::{ConfigError, Result};
pub use secrets::{ResolvedSecret, SecretSource};
pub use types::*;
