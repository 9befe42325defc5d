use anyhow::Result;
use clap::{Parser, Subcommand};
use risk_engine_core::{ConfigLoader, EngineConfig};

mod commands;
mod context;

use commands::{
    AssetsArgs, BackfillArgs, ConfidenceArgs, HistoryArgs, PerformanceArgs, ScoreArgs,
};
use context::EngineContext;

#[derive(Parser)]
#[command(name = "risk-engine")]
#[command(about = "Multi-factor risk scoring with adaptive confidence", long_about = None)]
struct Cli {
    /// Configuration profile, layered from config/Engine.<profile>.toml
    #[arg(long, global = true, env = "RISK_ENGINE_PROFILE")]
    profile: Option<String>,

    /// Explicit configuration file used instead of config/Engine.toml
    #[arg(long, global = true, conflicts_with = "profile")]
    config: Option<String>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported assets and their risk parameters
    Assets(AssetsArgs),
    /// Score the latest price of an asset and record it for confidence tracking
    Score(ScoreArgs),
    /// Build the daily regression-only risk series for a price history
    History(HistoryArgs),
    /// Replay a price history day by day through confidence tracking
    Backfill(BackfillArgs),
    /// Show static and adaptive confidence
    Confidence(ConfidenceArgs),
    /// Summarize a transaction ledger and portfolio value history
    Performance(PerformanceArgs),
}

fn init_logging(log_file: Option<&str>) -> Result<()> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        // stdout carries command output
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    match (&cli.config, &cli.profile) {
        (Some(path), _) => ConfigLoader::load_from(path),
        (None, Some(profile)) => ConfigLoader::load_with_profile(profile),
        (None, None) => ConfigLoader::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let ctx = EngineContext::new(load_config(&cli)?)?;

    match cli.command {
        Commands::Assets(args) => commands::run_assets(&args, &ctx)?,
        Commands::Score(args) => commands::run_score(args, &ctx).await?,
        Commands::History(args) => commands::run_history(&args, &ctx)?,
        Commands::Backfill(args) => commands::run_backfill(args, &ctx).await?,
        Commands::Confidence(args) => commands::run_confidence(&args, &ctx).await?,
        Commands::Performance(args) => commands::run_performance(&args)?,
    }

    Ok(())
}
