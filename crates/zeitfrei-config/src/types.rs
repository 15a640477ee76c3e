//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1"
//! port = 2094
//!
//! [database]
//! path = "users.db"
//!
//! [discord]
//! client_id = "..."
//! redirect_uri = "https://example.org/callback"
//! home_guild_id = "969732954572075008"
//!
//! [sync]
//! max_concurrency = 4
//! request_timeout_secs = 10
//!
//! [notify]
//! webhook_url = "https://discord.com/api/webhooks/..."
//!
//! [[bots]]
//! name = "music"
//! api_key = "..."
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeitfrei_types::{GuildId, defaults};

use crate::error::{ConfigError, Result};
use crate::secrets::{self, ResolvedSecret, SecretSource};

// ─────────────────────────────────────────────────────────────────────────────
// File Schema
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZeitfreiConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub discord: DiscordConfig,
    pub sync: SyncConfig,
    pub notify: NotifyConfig,
    pub bots: Vec<BotConfig>,
}

impl ZeitfreiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Resolve secrets from the process environment and validate.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.resolve_with(&secrets::process_env)
    }

    /// Resolve against an explicit environment lookup.
    pub fn resolve_with(&self, env: &dyn Fn(&str) -> Option<String>) -> Result<ResolvedConfig> {
        let mut problems = Vec::new();
        let mut warnings = Vec::new();

        let client_secret = secrets::resolve_secret(
            env,
            &[secrets::CLIENT_SECRET_ENV],
            self.discord.client_secret.as_deref(),
        );
        let bot_token = secrets::resolve_secret(env, &[secrets::BOT_TOKEN_ENV], self.discord.bot_token.as_deref());
        let webhook_url = secrets::resolve_secret(
            env,
            &[secrets::WEBHOOK_URL_ENV],
            self.notify.webhook_url.as_deref(),
        );

        for (name, secret) in [("discord.client_secret", &client_secret), ("discord.bot_token", &bot_token)] {
            match secret {
                None => problems.push(format!("missing {}", name)),
                Some(s) if s.source == SecretSource::ConfigFile => warnings.push(plaintext_warning(name)),
                Some(_) => {}
            }
        }

        let client_id = self.discord.client_id.clone().filter(|s| !s.is_empty());
        if client_id.is_none() {
            problems.push("missing discord.client_id".to_string());
        }
        let home_guild_id = self.discord.home_guild_id;
        if home_guild_id.is_none() {
            problems.push("missing discord.home_guild_id".to_string());
        }
        if self.sync.max_concurrency == 0 {
            problems.push("sync.max_concurrency must be at least 1".to_string());
        }

        let bots = self.resolve_bots(env, &mut problems, &mut warnings);
        if bots.is_empty() {
            problems.push(format!(
                "no bots configured: add a [[bots]] entry or set {}",
                secrets::API_KEY_ENV
            ));
        }

        let (Some(client_id), Some(client_secret), Some(bot_token), Some(home_guild_id)) =
            (client_id, client_secret, bot_token, home_guild_id)
        else {
            return Err(ConfigError::Invalid(problems));
        };
        if !problems.is_empty() {
            return Err(ConfigError::Invalid(problems));
        }

        Ok(ResolvedConfig {
            bind: self.server.bind.clone(),
            port: self.server.port,
            database_path: self.database.path.clone(),
            client_id,
            client_secret,
            redirect_uri: self.discord.redirect_uri.clone().unwrap_or_default(),
            bot_token,
            home_guild_id,
            api_base: self.discord.api_base.clone(),
            scopes: self.discord.scopes.clone(),
            max_concurrency: self.sync.max_concurrency,
            request_timeout: Duration::from_secs(self.sync.request_timeout_secs),
            webhook_url,
            bots,
            warnings,
        })
    }

    fn resolve_bots(
        &self,
        env: &dyn Fn(&str) -> Option<String>,
        problems: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) -> Vec<BotKey> {
        let mut bots = Vec::new();

        for (i, bot) in self.bots.iter().enumerate() {
            match bot.api_key.as_deref().filter(|k| !k.is_empty()) {
                Some(key) => {
                    warnings.push(plaintext_warning(&format!("bots[{}] ({})", i, bot.name)));
                    bots.push(BotKey {
                        name: bot.name.clone(),
                        api_key: key.to_string(),
                    });
                }
                None => problems.push(format!("bots[{}] ({}) has no api_key", i, bot.name)),
            }
        }

        if let Some(secret) = secrets::resolve_secret(env, &[secrets::API_KEY_ENV, secrets::LEGACY_API_KEY_ENV], None) {
            bots.retain(|b| b.name != DEFAULT_BOT_NAME);
            bots.push(BotKey {
                name: DEFAULT_BOT_NAME.to_string(),
                api_key: secret.value,
            });
        }

        bots
    }
}

/// Name given to the bot whose key comes from the environment.
pub const DEFAULT_BOT_NAME: &str = "default";

fn plaintext_warning(name: &str) -> String {
    format!(
        "{} is stored in plaintext in the config file. Consider an environment variable instead.",
        name
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::DEFAULT_BIND.to_string(),
            port: defaults::DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(defaults::DEFAULT_DATABASE_PATH),
        }
    }
}

/// Discord application and bot settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub bot_token: Option<String>,
    /// Guild every authorized user is added to.
    pub home_guild_id: Option<GuildId>,
    pub api_base: String,
    pub scopes: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            bot_token: None,
            home_guild_id: None,
            api_base: defaults::DISCORD_API_BASE.to_string(),
            scopes: defaults::DEFAULT_SCOPES.to_string(),
        }
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("home_guild_id", &self.home_guild_id)
            .field("api_base", &self.api_base)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

/// Reconciliation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Guilds processed at once during reconciliation.
    pub max_concurrency: usize,
    /// Bound on every outbound Discord call.
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrency: defaults::MAX_CONCURRENCY,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Discord webhook receiving revocation notices. Logged only when unset.
    pub webhook_url: Option<String>,
}

impl std::fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("webhook_url", &self.webhook_url.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A subscriber bot allowed to call the API.
#[derive(Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub name: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolved
// ─────────────────────────────────────────────────────────────────────────────

/// A subscriber bot identity with its key.
#[derive(Clone, PartialEq, Eq)]
pub struct BotKey {
    pub name: String,
    pub api_key: String,
}

impl std::fmt::Debug for BotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotKey")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Validated configuration with secrets in hand.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub bind: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub client_id: String,
    pub client_secret: ResolvedSecret,
    pub redirect_uri: String,
    pub bot_token: ResolvedSecret,
    pub home_guild_id: GuildId,
    pub api_base: String,
    pub scopes: String,
    pub max_concurrency: usize,
    pub request_timeout: Duration,
    pub webhook_url: Option<ResolvedSecret>,
    pub bots: Vec<BotKey>,
    /// Non-fatal findings, e.g. plaintext secrets.
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const FULL: &str = r#"
[server]
bind = "0.0.0.0"
port = 8080

[database]
path = "/var/lib/zeitfrei/users.db"

[discord]
client_id = "1234"
client_secret = "file-secret"
redirect_uri = "https://example.org/callback"
bot_token = "file-bot-token"
home_guild_id = "969732954572075008"

[sync]
max_concurrency = 2

[[bots]]
name = "music"
api_key = "music-key"
"#;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_for_empty_file() {
        let config = ZeitfreiConfig::from_toml("").unwrap();
        assert_eq!(config.server.port, defaults::DEFAULT_PORT);
        assert_eq!(config.database.path, PathBuf::from("users.db"));
        assert_eq!(config.discord.api_base, "https://discord.com/api");
        assert_eq!(config.sync.max_concurrency, 4);
        assert!(config.bots.is_empty());
    }

    #[test]
    fn test_full_file_resolves_with_plaintext_warnings() {
        let config = ZeitfreiConfig::from_toml(FULL).unwrap();
        let resolved = config.resolve_with(&env_of(&[])).unwrap();

        assert_eq!(resolved.bind, "0.0.0.0");
        assert_eq!(resolved.port, 8080);
        assert_eq!(resolved.home_guild_id, GuildId(969732954572075008));
        assert_eq!(resolved.max_concurrency, 2);
        assert_eq!(resolved.request_timeout, Duration::from_secs(10));
        assert_eq!(resolved.client_secret.source, SecretSource::ConfigFile);
        assert_eq!(resolved.bots.len(), 1);
        // client_secret, bot_token, bots[0]
        assert_eq!(resolved.warnings.len(), 3);
        assert!(resolved.warnings.iter().all(|w| w.contains("plaintext")));
    }

    #[test]
    fn test_env_secrets_override_file() {
        let config = ZeitfreiConfig::from_toml(FULL).unwrap();
        let env = env_of(&[
            (secrets::CLIENT_SECRET_ENV, "env-secret"),
            (secrets::BOT_TOKEN_ENV, "env-bot"),
        ]);
        let resolved = config.resolve_with(&env).unwrap();

        assert_eq!(resolved.client_secret.value, "env-secret");
        assert_eq!(resolved.bot_token.value, "env-bot");
        assert_eq!(resolved.warnings.len(), 1);
    }

    #[test]
    fn test_legacy_api_key_becomes_default_bot() {
        let config = ZeitfreiConfig::from_toml(FULL).unwrap();
        let resolved = config
            .resolve_with(&env_of(&[(secrets::LEGACY_API_KEY_ENV, "legacy-key")]))
            .unwrap();

        let names: Vec<&str> = resolved.bots.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["music", "default"]);
        assert_eq!(resolved.bots[1].api_key, "legacy-key");
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let config = ZeitfreiConfig::from_toml("[server]\nport = 1").unwrap();
        let err = config.resolve_with(&env_of(&[])).unwrap_err();

        let ConfigError::Invalid(problems) = err else {
            panic!("expected Invalid, got {:?}", err);
        };
        for field in ["client_secret", "bot_token", "client_id", "home_guild_id", "no bots"] {
            assert!(problems.iter().any(|p| p.contains(field)), "missing report for {}", field);
        }
    }

    #[test]
    fn test_bot_without_key_is_invalid() {
        let toml = FULL.replace("api_key = \"music-key\"", "");
        let config = ZeitfreiConfig::from_toml(&toml).unwrap();
        let err = config.resolve_with(&env_of(&[])).unwrap_err();
        assert!(err.to_string().contains("has no api_key"));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = ZeitfreiConfig::from_toml(FULL).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("file-secret"));
        assert!(!debug.contains("file-bot-token"));
        assert!(!debug.contains("music-key"));
    }
}
