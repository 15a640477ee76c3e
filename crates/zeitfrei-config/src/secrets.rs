//! Secret resolution.
//!
//! Resolution order:
//! 1. Environment variable
//! 2. Config file (with warning)

/// Environment variable for the OAuth client secret.
pub const CLIENT_SECRET_ENV: &str = "ZEITFREI_CLIENT_SECRET";

/// Environment variable for the Discord bot token.
pub const BOT_TOKEN_ENV: &str = "ZEITFREI_BOT_TOKEN";

/// Environment variable for the API key of the `default` bot.
pub const API_KEY_ENV: &str = "ZEITFREI_API_KEY";

/// Single-key variable read by older deployments; also maps to the `default` bot.
pub const LEGACY_API_KEY_ENV: &str = "API_KEY";

/// Environment variable for the revocation webhook URL.
pub const WEBHOOK_URL_ENV: &str = "ZEITFREI_WEBHOOK_URL";

/// A secret value with provenance.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    pub value: String,
    pub source: SecretSource,
}

impl std::fmt::Debug for ResolvedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecret")
            .field("value", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Environment variable.
    EnvVar(String),
    /// Config file (plaintext, not recommended).
    ConfigFile,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
        }
    }
}

/// Resolve a secret from `env_vars` (first non-empty wins), then the config value.
pub fn resolve_secret(
    env: &dyn Fn(&str) -> Option<String>,
    env_vars: &[&str],
    config_value: Option<&str>,
) -> Option<ResolvedSecret> {
    for var in env_vars {
        if let Some(value) = env(var)
            && !value.is_empty()
        {
            return Some(ResolvedSecret {
                value,
                source: SecretSource::EnvVar(var.to_string()),
            });
        }
    }

    config_value.filter(|v| !v.is_empty()).map(|v| ResolvedSecret {
        value: v.to_string(),
        source: SecretSource::ConfigFile,
    })
}

/// Process environment lookup.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_wins_over_file() {
        let env = env_of(&[(BOT_TOKEN_ENV, "from-env")]);
        let secret = resolve_secret(&env, &[BOT_TOKEN_ENV], Some("from-file")).unwrap();
        assert_eq!(secret.value, "from-env");
        assert_eq!(secret.source, SecretSource::EnvVar(BOT_TOKEN_ENV.to_string()));
    }

    #[test]
    fn test_empty_env_falls_through() {
        let env = env_of(&[(API_KEY_ENV, ""), (LEGACY_API_KEY_ENV, "legacy")]);
        let secret = resolve_secret(&env, &[API_KEY_ENV, LEGACY_API_KEY_ENV], None).unwrap();
        assert_eq!(secret.value, "legacy");
    }

    #[test]
    fn test_file_value_is_marked_plaintext() {
        let env = env_of(&[]);
        let secret = resolve_secret(&env, &[BOT_TOKEN_ENV], Some("from-file")).unwrap();
        assert_eq!(secret.source, SecretSource::ConfigFile);
        assert!(resolve_secret(&env, &[BOT_TOKEN_ENV], None).is_none());
    }

    #[test]
    fn test_debug_redacts_value() {
        let secret = ResolvedSecret {
            value: "hunter2".to_string(),
            source: SecretSource::ConfigFile,
        };
        assert!(!format!("{:?}", secret).contains("hunter2"));
    }
}
