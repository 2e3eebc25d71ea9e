//! CLI entry point for the Hansard harvester.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod app_config;
mod cli;
mod commands;

use app_config::{Settings, load_file_config};
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?cli, "CLI arguments parsed");

    match &cli.command {
        Command::Info { files } => commands::run_info_command(files),
        Command::Setdiff { a, b } => commands::run_setdiff_command(a, b),
        Command::Queries => {
            let settings = load_settings(&cli)?;
            commands::run_queries_command(&settings);
            Ok(())
        }
        Command::Crawl(args) => {
            let settings = load_settings(&cli)?;
            commands::run_crawl_command(&settings, args).await
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let file = load_file_config(cli.config.as_deref())?;
    Ok(Settings::resolve(file, cli.data_dir.clone()))
}
