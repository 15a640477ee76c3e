//! Check-config command - validates configuration without starting anything.

use anyhow::{Result, bail};
use zeitfrei_config::ConfigError;

use super::Context;

pub fn run(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;

    match &loaded.source {
        Some(path) => println!("Loaded config: {}", path.display()),
        None => println!("No config file loaded"),
    }
    if ctx.verbose {
        for path in &loaded.searched {
            println!("  searched: {}", path.display());
        }
    }
    for warning in &loaded.warnings {
        println!("warning: {}", warning);
    }

    let resolved = match loaded.config.resolve() {
        Ok(resolved) => resolved,
        Err(ConfigError::Invalid(problems)) => {
            for problem in &problems {
                eprintln!("error: {}", problem);
            }
            bail!("Configuration is invalid ({} problem(s))", problems.len());
        }
        Err(e) => return Err(e.into()),
    };

    for warning in &resolved.warnings {
        println!("warning: {}", warning);
    }

    println!("Listen:        {}:{}", resolved.bind, resolved.port);
    println!("Database:      {}", resolved.database_path.display());
    println!("Home guild:    {}", resolved.home_guild_id);
    println!("Client secret: {}", resolved.client_secret.source);
    println!("Bot token:     {}", resolved.bot_token.source);
    match &resolved.webhook_url {
        Some(url) => println!("Webhook:       {}", url.source),
        None => println!("Webhook:       none (revocations are logged only)"),
    }
    let names: Vec<&str> = resolved.bots.iter().map(|b| b.name.as_str()).collect();
    println!("Bots:          {}", names.join(", "));
    println!("Configuration OK");

    Ok(())
}
