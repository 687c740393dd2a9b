#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::doc_markdown, clippy::uninlined_format_args)]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use tertulia::{channels, Config};

/// `tertulia` — a Discord lurker that chimes into the conversation with Gemini.
#[derive(Parser, Debug)]
#[command(name = "tertulia")]
#[command(version)]
#[command(about = "Counts channel chatter and joins in when it's time", long_about = None)]
struct Cli {
    /// Directory holding config.toml (default: ~/.tertulia)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to Discord and start responding (the default)
    Run,
    /// Check that Discord and Gemini are reachable with the configured credentials
    Doctor,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    // Configuration problems are fatal before any connection is attempted
    let config = match Config::load(cli.config_dir.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => channels::run(config).await,
        Commands::Doctor => channels::doctor(&config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
