use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chatrelay")]
#[command(version)]
#[command(about = "Streaming chat relay for Groq-hosted models", long_about = None)]
pub struct Cli {
    /// Path to configuration file (applied over all other sources)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Listen address override
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port override
    #[arg(short, long)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// List available models
    Models,
    /// Write a default configuration file
    Init,
    /// Show version information
    Version,
}
