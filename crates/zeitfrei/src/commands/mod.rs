//! CLI command implementations.

pub mod check_config;
pub mod serve;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use zeitfrei_config::LoadedConfig;

/// Options shared by every command.
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub verbose: bool,
}

impl Context {
    pub fn load_config(&self) -> Result<LoadedConfig> {
        zeitfrei_config::load_config(self.config_path.as_deref()).context("Failed to load configuration")
    }
}
