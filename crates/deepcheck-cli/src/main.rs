//! Deepcheck command-line tool.

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::from_default_env()
        .add_directive(format!("deepcheck={level}").parse()?)
        .add_directive("ort=warn".parse()?);

    // Logs go to stderr; stdout carries command output
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Analyze {
            video,
            sequence_length,
            log,
        } => commands::run_analyze(&video, sequence_length, &log).await,
        Commands::Stats { log } => commands::run_stats(&log).await,
        Commands::Report { video, log } => commands::run_report(&video, &log).await,
        Commands::SyncModels {
            manifest,
            models_dir,
            force,
            dry_run,
        } => commands::run_sync_models(&manifest, &models_dir, force, dry_run).await,
        Commands::Selfcheck => commands::run_selfcheck().await,
    }
}
