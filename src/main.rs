use anyhow::Result;
use clap::Parser;

use chatrelay::{
    app::load_config,
    cli::{apply_overrides, handle_command, Cli},
    utils::init_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_logger(cli.verbose);

    let config = apply_overrides(&cli, load_config(cli.config.as_deref())?);
    handle_command(&cli, config).await
}
