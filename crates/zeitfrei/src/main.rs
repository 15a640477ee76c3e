//! Zeitfrei - Discord OAuth gatekeeper
//!
//! Main entry point for the zeitfrei CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{check_config, serve};

/// Zeitfrei - keeps Discord role grants in step with OAuth authorization
#[derive(Parser)]
#[command(name = "zeitfrei")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Path to config file (overrides default discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve(serve::ServeArgs),

    /// Validate the configuration and show where it came from
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json_logs);

    let ctx = commands::Context {
        config_path: cli.config,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Serve(args) => serve::run(args, &ctx).await,
        Commands::CheckConfig => check_config::run(&ctx),
    }
}

/// `RUST_LOG` wins over the built-in filter.
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose {
        "zeitfrei=debug,zeitfrei_server=debug,zeitfrei_sync=debug,zeitfrei_oauth=debug,zeitfrei_store=debug,tower_http=debug,info"
    } else {
        "zeitfrei=info,zeitfrei_server=info,zeitfrei_sync=info,zeitfrei_oauth=info,zeitfrei_store=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
