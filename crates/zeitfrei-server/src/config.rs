//! Server configuration.

use std::net::SocketAddr;

use zeitfrei_types::defaults;

/// A subscriber bot allowed to call the API.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub bot: String,
    pub key: String,
}

impl ApiKey {
    pub fn new(bot: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bot: bot.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey").field("bot", &self.bot).finish_non_exhaustive()
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Known subscriber bots. An empty list rejects every gated request.
    pub api_keys: Vec<ApiKey>,
}

impl ServerConfig {
    pub fn new(api_keys: Vec<ApiKey>) -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], defaults::DEFAULT_PORT)),
            api_keys,
        }
    }

    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }
}
