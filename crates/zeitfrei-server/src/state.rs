//! Application state shared across handlers.

use std::sync::Arc;

use zeitfrei_store::{GuildRegistry, TokenStore};
use zeitfrei_sync::Gatekeeper;

use crate::config::ServerConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gatekeeper: Arc<Gatekeeper>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(gatekeeper: Gatekeeper, config: ServerConfig) -> Self {
        Self {
            gatekeeper: Arc::new(gatekeeper),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenStore {
        self.gatekeeper.tokens()
    }

    pub fn guilds(&self) -> &GuildRegistry {
        self.gatekeeper.guilds()
    }
}
