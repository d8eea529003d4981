//! imgwarm - Dockerfile base-image cache warmer
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use imgwarm::cli::{Cli, Commands};
use imgwarm::config::ConfigManager;
use imgwarm::error::WarmResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> WarmResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("imgwarm=warn"),
        1 => EnvFilter::new("imgwarm=info"),
        _ => EnvFilter::new("imgwarm=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }

    debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Warm(args) => imgwarm::cli::commands::warm(args, &config).await,
        Commands::Resolve(args) => imgwarm::cli::commands::resolve(args, &config).await,
        Commands::Config(args) => {
            imgwarm::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
