//! HTTP surface for subscriber bots.
//!
//! Every route except `/health` and `/callback` requires an `X-API-KEY`
//! header matching a configured bot.
//!
//! # Example
//!
//! ```ignore
//! use zeitfrei_server::{ApiKey, Server, ServerConfig};
//!
//! let config = ServerConfig::new(vec![ApiKey::new("music", "secret")])
//!     .with_bind_address("127.0.0.1:2094".parse()?);
//! Server::new(gatekeeper, config).run(shutdown_signal()).await?;
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use auth::{API_KEY_HEADER, AuthError, BotIdentity, api_key_middleware};
pub use config::{ApiKey, ServerConfig};
pub use error::{ErrorResponse, Result, ServerError};
pub use state::AppState;

use std::future::Future;

use axum::{Router, middleware};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use zeitfrei_sync::Gatekeeper;

/// The zeitfrei HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(gatekeeper: Gatekeeper, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(gatekeeper, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        use axum::routing::get;

        Router::new()
            .merge(routes::health_routes())
            // The OAuth redirect carries its own proof (the code).
            .route("/callback", get(routes::callback_handler))
            .merge(self.api_routes())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Routes gated by the API key middleware.
    fn api_routes(&self) -> Router<AppState> {
        use axum::routing::{delete, get, post};

        Router::new()
            .route("/user/{id}", get(routes::get_user_handler))
            .route("/all_user", get(routes::all_users_handler))
            .route("/delete_user/{id}", delete(routes::delete_user_handler))
            .route("/add_user_to_server/{id}", post(routes::add_user_to_server_handler))
            .route("/add_guild", post(routes::add_guild_handler))
            .route("/delete_guild_data", delete(routes::delete_guild_handler))
            .route(
                "/get_guild_auth_role_data/{guild_id}",
                get(routes::get_guild_auth_role_data_handler),
            )
            .route("/get_auth_role_data/{pair}", get(routes::get_auth_role_data_handler))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth::api_key_middleware,
            ))
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let addr = self.state.config.bind_address;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener (useful for testing).
    pub async fn serve(self, listener: TcpListener, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let router = self.router();
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        info!(%addr, bots = self.state.config.api_keys.len(), "Starting server");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }
}
