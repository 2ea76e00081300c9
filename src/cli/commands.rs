use anyhow::Result;
use colored::Colorize;

use crate::{
    app::{init_config, Config},
    models::ModelRegistry,
    server::RelayServer,
};

use super::{Cli, Commands};

/// Handle the selected subcommand; no subcommand means `serve`
pub async fn handle_command(cli: &Cli, config: Config) -> Result<()> {
    match cli.command.clone().unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Models => {
            list_models(&ModelRegistry::builtin());
            Ok(())
        }
        Commands::Init => {
            let (path, created) = init_config(cli.config.as_deref())?;
            if created {
                println!("Created default configuration at: {}", path.display());
            } else {
                println!("Configuration already exists at: {}", path.display());
            }
            Ok(())
        }
        Commands::Version => {
            show_version();
            Ok(())
        }
    }
}

/// Apply `--host` / `--port` over the loaded configuration
pub fn apply_overrides(cli: &Cli, mut config: Config) -> Config {
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config
}

async fn serve(config: Config) -> Result<()> {
    RelayServer::new(config)?.run().await?;
    Ok(())
}

/// List available models
pub fn list_models(registry: &ModelRegistry) {
    println!("Available models:");
    for model in registry.models() {
        let marker = if model.key == registry.baseline().key {
            " (baseline)".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "  • {:<18} {} [{}]{}",
            model.key.green(),
            model.name,
            model.provider_model.cyan(),
            marker
        );
    }
}

/// Show version information
pub fn show_version() {
    println!("chatrelay v{}", env!("CARGO_PKG_VERSION"));
    println!("   Streaming chat relay with multi-model consensus answers");
}
