//! Serve command - runs the gatekeeper HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::{info, warn};

use zeitfrei_config::ResolvedConfig;
use zeitfrei_oauth::{DiscordOAuthClient, DiscordOAuthConfig};
use zeitfrei_server::{ApiKey, Server, ServerConfig};
use zeitfrei_store::Database;
use zeitfrei_sync::{DiscordGuildClient, Gatekeeper, LogNotifier, SharedNotifier, SyncOptions, WebhookNotifier};

use super::Context;

/// Arguments for the serve command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }
    if let Some(path) = &loaded.source {
        info!(path = %path.display(), "Loaded config");
    }

    let resolved = loaded.config.resolve()?;
    for warning in &resolved.warnings {
        warn!("{}", warning);
    }

    let bind = args.bind.as_deref().unwrap_or(&resolved.bind);
    let port = args.port.unwrap_or(resolved.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let gatekeeper = build_gatekeeper(&resolved)?;
    let api_keys = resolved
        .bots
        .iter()
        .map(|bot| ApiKey::new(bot.name.clone(), bot.api_key.clone()))
        .collect();
    let config = ServerConfig::new(api_keys).with_bind_address(addr);

    Server::new(gatekeeper, config).run(shutdown_signal()).await?;
    Ok(())
}

fn build_gatekeeper(resolved: &ResolvedConfig) -> Result<Gatekeeper> {
    let db = Database::open(&resolved.database_path)
        .with_context(|| format!("Failed to open database {}", resolved.database_path.display()))?;

    // One connection pool for every outbound call.
    let http = reqwest::Client::builder()
        .user_agent(concat!("zeitfrei/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let oauth = DiscordOAuthConfig::new(
        resolved.client_id.clone(),
        resolved.client_secret.value.clone(),
        resolved.redirect_uri.clone(),
    )
    .with_api_base(resolved.api_base.clone())
    .with_timeout(resolved.request_timeout);
    let provider = Arc::new(DiscordOAuthClient::new(http.clone(), oauth));

    let guild_api = Arc::new(
        DiscordGuildClient::new(http.clone(), resolved.bot_token.value.clone())
            .with_api_base(resolved.api_base.clone())
            .with_timeout(resolved.request_timeout),
    );

    let notifier: SharedNotifier = match &resolved.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(http, url.value.clone()).with_timeout(resolved.request_timeout)),
        None => Arc::new(LogNotifier),
    };

    let options = SyncOptions {
        home_guild_id: resolved.home_guild_id,
        max_concurrency: resolved.max_concurrency,
        request_timeout: resolved.request_timeout,
    };

    Ok(Gatekeeper::new(db, provider, guild_api, options).with_notifier(notifier))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
