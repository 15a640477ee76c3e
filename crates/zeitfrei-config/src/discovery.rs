//! Config file discovery.
//!
//! The first existing file wins:
//! 1. explicit path (`--config`)
//! 2. `ZEITFREI_CONFIG` env var
//! 3. `./zeitfrei.toml`
//! 4. `<platform config dir>/zeitfrei/config.toml`
//!
//! With no file at all, defaults are used and every required setting must
//! come from the environment.

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, ZeitfreiConfig};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "zeitfrei.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for config directory resolution.
const APP_NAME: &str = "zeitfrei";

/// Environment variable naming a config file.
pub const CONFIG_PATH_ENV: &str = "ZEITFREI_CONFIG";

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ZeitfreiConfig,
    /// The file the config was read from, if any.
    pub source: Option<PathBuf>,
    /// Paths checked, in order.
    pub searched: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Discover and load the configuration.
///
/// An explicit or env-named path must exist; the implicit locations are
/// optional.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let env_path = std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);
    load_config_from(explicit, env_path.as_deref(), Path::new("."), user_config_path().as_deref())
}

fn load_config_from(
    explicit: Option<&Path>,
    env_path: Option<&Path>,
    project_dir: &Path,
    user_path: Option<&Path>,
) -> Result<LoadedConfig> {
    if let Some(path) = explicit.or(env_path) {
        let config = load_config_file(path)?;
        return Ok(LoadedConfig {
            config,
            source: Some(path.to_path_buf()),
            searched: vec![path.to_path_buf()],
            warnings: Vec::new(),
        });
    }

    let mut searched = vec![project_dir.join(PROJECT_CONFIG_FILE)];
    searched.extend(user_path.map(Path::to_path_buf));

    for path in &searched {
        if path.is_file() {
            let config = load_config_file(path)?;
            return Ok(LoadedConfig {
                config,
                source: Some(path.clone()),
                searched,
                warnings: Vec::new(),
            });
        }
    }

    Ok(LoadedConfig {
        config: ZeitfreiConfig::new(),
        source: None,
        searched,
        warnings: vec!["No config file found; using defaults and environment".to_string()],
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<ZeitfreiConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    ZeitfreiConfig::from_toml(&contents)
}

/// `<platform config dir>/zeitfrei/config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME).join(USER_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_user_config_path_shape() {
        if let Some(p) = user_config_path() {
            assert!(p.ends_with("zeitfrei/config.toml"));
        }
    }

    #[test]
    fn test_explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("explicit.toml");
        fs::write(&explicit, "[server]\nport = 1111").unwrap();
        fs::write(dir.path().join(PROJECT_CONFIG_FILE), "[server]\nport = 2222").unwrap();

        let loaded = load_config_from(Some(&explicit), None, dir.path(), None).unwrap();
        assert_eq!(loaded.config.server.port, 1111);
        assert_eq!(loaded.source.as_deref(), Some(explicit.as_path()));
    }

    #[test]
    fn test_env_path_before_project_file() {
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join("env.toml");
        fs::write(&env_file, "[server]\nport = 3333").unwrap();
        fs::write(dir.path().join(PROJECT_CONFIG_FILE), "[server]\nport = 2222").unwrap();

        let loaded = load_config_from(None, Some(&env_file), dir.path(), None).unwrap();
        assert_eq!(loaded.config.server.port, 3333);
    }

    #[test]
    fn test_project_file_before_user_file() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        let user_file = user.path().join(USER_CONFIG_FILE);
        fs::write(&user_file, "[server]\nport = 4444").unwrap();

        let loaded = load_config_from(None, None, project.path(), Some(&user_file)).unwrap();
        assert_eq!(loaded.config.server.port, 4444);

        fs::write(project.path().join(PROJECT_CONFIG_FILE), "[server]\nport = 2222").unwrap();
        let loaded = load_config_from(None, None, project.path(), Some(&user_file)).unwrap();
        assert_eq!(loaded.config.server.port, 2222);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/zeitfrei.toml")), None, Path::new("."), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_CONFIG_FILE), "not valid toml {{{{").unwrap();

        let err = load_config_from(None, None, dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_no_files_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = load_config_from(None, None, dir.path(), None).unwrap();
        assert!(loaded.source.is_none());
        assert_eq!(loaded.searched.len(), 1);
        assert_eq!(loaded.warnings.len(), 1);
    }
}
