mod adapters;
mod cli;
mod config;
mod db;
mod elo;
mod engine;
mod error;
mod fuzzy;
mod maintenance;
mod models;
mod resolver;
mod validation;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "youthforge")]
#[command(about = "Youth-soccer ingest and reconciliation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one adapter's scraping engine end to end
    Scrape {
        #[arg(long)]
        adapter: String,
        #[arg(long)]
        event: Option<String>,
        #[arg(long)]
        reset: bool,
        #[arg(long)]
        resume: Option<usize>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the staging-to-canonical validation pipeline
    Validate {
        #[arg(long)]
        source: Option<String>,
        #[arg(long, default_value_t = 500)]
        limit: i64,
        #[arg(long)]
        dry_run: bool,
    },
    /// Replay the current season and recompute every team's Elo rating
    EloRecalc {
        #[arg(long)]
        dry_run: bool,
    },
    /// Replay history and backfill per-day rank_history snapshots
    EloBackfill {
        #[arg(long)]
        dry_run: bool,
    },
    /// Recompute national/state ranks over existing ratings and history
    RankBackfill {
        #[arg(long)]
        dry_run: bool,
    },
    /// Idempotent batch maintenance procedures
    Maintenance {
        #[command(subcommand)]
        op: cli::MaintenanceOp,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    db::init_database_with_pool(&pool).await?;

    match cli.command {
        Commands::Scrape { adapter, event, reset, resume, dry_run } => {
            cli::run_scrape(&pool, &config, &adapter, event.as_deref(), reset, resume, dry_run).await?;
        }
        Commands::Validate { source, limit, dry_run } => {
            cli::run_validate(&pool, source.as_deref(), limit, dry_run).await?;
        }
        Commands::EloRecalc { dry_run } => {
            cli::run_elo_recalc(&pool, dry_run).await?;
        }
        Commands::EloBackfill { dry_run } => {
            cli::run_elo_backfill(&pool, dry_run).await?;
        }
        Commands::RankBackfill { dry_run } => {
            cli::run_rank_backfill(&pool, dry_run).await?;
        }
        Commands::Maintenance { op } => {
            cli::run_maintenance(&pool, op).await?;
        }
    }

    Ok(())
}
