use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use pulse_learn::Workspace;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::ConfigLoader;

#[derive(Parser)]
#[command(name = "pulse", about = "Adaptive content-strategy learning")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score post history and update the learning state
    Analyze,
    /// Verify pending hypotheses against analyzed posts
    Verify,
    /// Publish a fresh recommendation
    Recommend,
    /// Summarize the learning state
    Report,
    /// Run analyze, verify, recommend and report in sequence
    All,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ConfigLoader::load()?;
    tracing::debug!(data_dir = %config.storage.data_dir.display(), "Loaded configuration");
    let workspace = Workspace::new(config.storage.data_dir.clone(), config.learn_config());
    let now = Utc::now();

    match cli.command {
        Commands::Analyze => commands::analyze::run(&workspace, now),
        Commands::Verify => commands::verify::run(&workspace, now),
        Commands::Recommend => commands::recommend::run(&workspace, now),
        Commands::Report => commands::report::run(&workspace, now),
        Commands::All => commands::all::run(&workspace, now),
    }
}
