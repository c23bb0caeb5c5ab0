use anyhow::{anyhow, Result};
use clap::Subcommand;
use sqlx::PgPool;

use crate::config::Config;
use crate::{db, elo, engine, maintenance, validation};

#[derive(Subcommand)]
pub enum MaintenanceOp {
    BirthYear {
        #[arg(long)]
        dry_run: bool,
    },
    UnlinkedMatches {
        #[arg(long)]
        dry_run: bool,
    },
    AliasCleanup {
        #[arg(long)]
        dry_run: bool,
    },
}

#[allow(clippy::too_many_arguments)]
pub async fn run_scrape(
    pool: &PgPool,
    config: &Config,
    adapter_id: &str,
    event_filter: Option<&str>,
    reset: bool,
    resume: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    let adapter = adapters_find(adapter_id)?;

    println!("🕸️  Scraping {} ...", adapter.id);
    if dry_run {
        println!("   (dry-run: events will be discovered but staging writes are skipped)");
        return Ok(());
    }

    let summary = engine::run_adapter(pool, config, &adapter, event_filter, reset, resume).await?;

    println!("✅ {}", summary.exit_reason);
    println!(
        "   events discovered={} scraped={} matches staged={} failures={}",
        summary.events_discovered,
        summary.events_scraped,
        summary.matches_staged,
        summary.failures.len()
    );
    println!(
        "   requests={} retries={} rate_limit_hits={} processed={} skipped={} elapsed={:.1}s",
        summary.requests,
        summary.retries,
        summary.rate_limit_hits,
        summary.processed,
        summary.skipped,
        summary.elapsed.as_secs_f64()
    );
    for failure in &summary.failures {
        println!("   ⚠️  event {} failed after {} attempts: {}", failure.source_event_id, failure.attempts, failure.error);
    }

    Ok(())
}

fn adapters_find(adapter_id: &str) -> Result<crate::adapters::Adapter> {
    crate::adapters::find(adapter_id).ok_or_else(|| anyhow!("unknown adapter: {adapter_id}"))
}

pub async fn run_validate(pool: &PgPool, source: Option<&str>, limit: i64, dry_run: bool) -> Result<()> {
    println!("🔎 Validating staged matches{} (limit {limit})...", source.map(|s| format!(" from {s}")).unwrap_or_default());

    if dry_run {
        let batch = db::fetch_unprocessed_batch(pool, source, limit).await?;
        println!("   (dry-run) {} unprocessed rows would be validated", batch.len());
        return Ok(());
    }

    let summary = validation::run(pool, source, limit).await?;
    println!(
        "✅ linked={} ambiguous={} rejected={} errored={}",
        summary.linked, summary.ambiguous, summary.rejected, summary.errored
    );

    Ok(())
}

async fn current_season_bounds(pool: &PgPool) -> Result<(chrono::NaiveDate, chrono::NaiveDate)> {
    let season = db::get_current_season(pool)
        .await?
        .ok_or_else(|| anyhow!("no current season configured; seed the `seasons` table first"))?;
    Ok((season.start_date, season.end_date))
}

pub async fn run_elo_recalc(pool: &PgPool, dry_run: bool) -> Result<()> {
    println!("♟️  Recalculating Elo ratings for the current season...");
    if dry_run {
        println!("   (dry-run) ratings would be reset and the season replayed");
        return Ok(());
    }

    let (start, end) = current_season_bounds(pool).await?;
    let outcome = elo::replay_season(pool, start, end).await?;
    let ranked = elo::recompute_ranks(pool).await?;

    println!("✅ replayed {} matches, updated {} rank rows", outcome.matches_replayed, ranked);
    Ok(())
}

pub async fn run_elo_backfill(pool: &PgPool, dry_run: bool) -> Result<()> {
    println!("🗂️  Backfilling rank history...");
    if dry_run {
        println!("   (dry-run) the season would be replayed and every historical snapshot re-ranked");
        return Ok(());
    }

    let (start, end) = current_season_bounds(pool).await?;
    let outcome = elo::replay_season(pool, start, end).await?;
    let snapshots = elo::backfill_rank_history(pool).await?;

    println!("✅ replayed {} matches, re-ranked {} historical snapshots", outcome.matches_replayed, snapshots);
    Ok(())
}

pub async fn run_rank_backfill(pool: &PgPool, dry_run: bool) -> Result<()> {
    println!("🏅 Recomputing national/state ranks over current ratings...");
    if dry_run {
        println!("   (dry-run) ranks would be recomputed without touching ratings");
        return Ok(());
    }

    let updated = elo::recompute_ranks(pool).await?;
    println!("✅ updated {updated} team rank rows");
    Ok(())
}

pub async fn run_maintenance(pool: &PgPool, op: MaintenanceOp) -> Result<()> {
    let report = match op {
        MaintenanceOp::BirthYear { dry_run } => maintenance::birth_year_repair(pool, dry_run).await?,
        MaintenanceOp::UnlinkedMatches { dry_run } => maintenance::recover_unlinked_matches(pool, dry_run).await?,
        MaintenanceOp::AliasCleanup { dry_run } => maintenance::alias_cleanup(pool, dry_run).await?,
    };

    let mode = if report.dry_run { "dry-run" } else { "applied" };
    println!("✅ {} ({mode}): {} rows affected", report.op, report.affected);
    Ok(())
}
