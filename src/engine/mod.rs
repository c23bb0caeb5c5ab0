use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::adapters::{Adapter, AdapterContext, DiscoveredEvent, RateLimitPolicy};
use crate::config::Config;
use crate::db;
use crate::error::PipelineError;
use crate::models::StagedMatch;

const STAGING_BATCH_SIZE: usize = 50;
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Checkpoint {
    pub adapter_id: String,
    pub last_event_index: usize,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Checkpoint {
    fn path(checkpoint_dir: &Path, adapter_id: &str) -> PathBuf {
        checkpoint_dir.join(format!("{adapter_id}.json"))
    }

    pub fn load(checkpoint_dir: &Path, adapter_id: &str) -> Checkpoint {
        let path = Self::path(checkpoint_dir, adapter_id);
        fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_else(|| Checkpoint { adapter_id: adapter_id.to_string(), last_event_index: 0, updated_at: None })
    }

    pub fn save(&self, checkpoint_dir: &Path) -> Result<()> {
        fs::create_dir_all(checkpoint_dir)?;
        let path = Self::path(checkpoint_dir, &self.adapter_id);
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FailedItem {
    pub source_event_id: String,
    pub error: String,
    pub attempts: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub adapter_id: String,
    pub events_discovered: usize,
    pub events_scraped: usize,
    pub matches_staged: u64,
    pub failures: Vec<FailedItem>,
    pub exit_reason: String,
    pub requests: u64,
    pub retries: u64,
    pub rate_limit_hits: u64,
    pub processed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub elapsed: Duration,
}

/// Runs one adapter end to end: discover, scrape (with retry/backoff and
/// checkpointing), and a batched write into the staging table. A single
/// process drives one adapter; parallelism only comes from running
/// multiple adapter processes side by side, never from threads within one.
pub async fn run_adapter(
    pool: &PgPool,
    config: &Config,
    adapter: &Adapter,
    event_filter: Option<&str>,
    reset: bool,
    resume_offset: Option<usize>,
) -> Result<RunSummary> {
    let started_at = Instant::now();
    let ctx = AdapterContext::new(Config::adapter_credential(adapter.id, "API_KEY"));

    let mut checkpoint = if reset {
        Checkpoint { adapter_id: adapter.id.to_string(), last_event_index: 0, updated_at: None }
    } else {
        Checkpoint::load(&config.checkpoint_dir, adapter.id)
    };
    if let Some(offset) = resume_offset {
        checkpoint.last_event_index = offset;
    }

    let discover = (adapter.discover_events)(ctx.clone());
    let limiter = adapter.rate_limit.governor();
    limiter.until_ready().await;
    let mut events = discover.await.context("event discovery failed")?;

    if let Some(id) = event_filter {
        events.retain(|e| e.source_event_id == id);
    }
    let events_discovered = events.len();

    let (tx, rx) = mpsc::channel::<StagedMatch>(CHANNEL_CAPACITY);
    let writer = tokio::spawn(staging_writer(pool.clone(), rx));

    let mut events_scraped = 0usize;
    let mut failures = Vec::new();
    let mut exit_reason = "COMPLETED".to_string();
    let mut requests = 0u64;
    let mut retries = 0u64;
    let mut rate_limit_hits = 0u64;
    let mut skipped = 0u64;

    let deadline = config.timeout.map(|wall_clock| Instant::now() + wall_clock);

    for (index, event) in events.iter().enumerate().skip(checkpoint.last_event_index) {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                exit_reason = "TIMEOUT".to_string();
                skipped = (events.len() - index) as u64;
                break;
            }
        }

        limiter.until_ready().await;
        if adapter.rate_limit.inter_event_delay > Duration::ZERO {
            tokio::time::sleep(adapter.rate_limit.inter_event_delay).await;
        }

        let outcome = scrape_with_retry(adapter, &ctx, event).await;
        requests += outcome.requests;
        retries += outcome.retries;
        rate_limit_hits += outcome.rate_limit_hits;

        match outcome.result {
            Ok(matches) => {
                for m in matches {
                    if tx.send(m).await.is_err() {
                        break;
                    }
                }
                events_scraped += 1;
            }
            Err((error, attempts)) => {
                failures.push(FailedItem {
                    source_event_id: event.source_event_id.clone(),
                    error,
                    attempts,
                    occurred_at: Utc::now(),
                });
            }
        }

        checkpoint.last_event_index = index + 1;
        checkpoint.updated_at = Some(Utc::now());
        checkpoint.save(&config.checkpoint_dir).ok();
    }

    drop(tx);
    let matches_staged = writer.await.context("staging writer task panicked")??;

    if !failures.is_empty() {
        persist_failed_items(&config.failed_items_path, &failures)?;
    }

    Ok(RunSummary {
        adapter_id: adapter.id.to_string(),
        events_discovered,
        events_scraped,
        matches_staged,
        failed: failures.len() as u64,
        failures,
        exit_reason,
        requests,
        retries,
        rate_limit_hits,
        processed: events_scraped as u64,
        skipped,
        elapsed: started_at.elapsed(),
    })
}

struct ScrapeOutcome {
    result: std::result::Result<Vec<StagedMatch>, (String, u32)>,
    requests: u64,
    retries: u64,
    rate_limit_hits: u64,
}

/// Retries a single event's scrape under the adapter's own backoff ceiling. A
/// 429 is special-cased per the rate-limit propagation policy: it waits out
/// exactly one cooldown (the adapter's configured fallback, since Retry-After
/// already drives `cooldown_secs` when present) and retries without
/// consuming an attempt, since a cooperative cooldown isn't the same kind of
/// failure as a flaky request. A 5xx gets the adapter's server-error
/// cooldown before falling into the normal backoff ladder.
async fn scrape_with_retry(adapter: &Adapter, ctx: &AdapterContext, event: &DiscoveredEvent) -> ScrapeOutcome {
    let policy = &adapter.rate_limit;
    let mut attempt = 0u32;
    let mut requests = 0u64;
    let mut retries = 0u64;
    let mut rate_limit_hits = 0u64;

    loop {
        requests += 1;
        match (adapter.scrape_event)(ctx.clone(), event.clone()).await {
            Ok(matches) => return ScrapeOutcome { result: Ok(matches), requests, retries, rate_limit_hits },
            Err(e) => {
                if let Some(PipelineError::RateLimited { cooldown_secs }) = e.downcast_ref::<PipelineError>() {
                    rate_limit_hits += 1;
                    let cooldown = cooldown_secs
                        .map(Duration::from_secs)
                        .unwrap_or(policy.rate_limit_cooldown)
                        .min(policy.max_delay);
                    tracing::warn!(adapter = adapter.id, event = %event.source_event_id, "rate limited, cooling down {:?}", cooldown);
                    tokio::time::sleep(cooldown).await;
                    continue;
                }
                if matches!(e.downcast_ref::<PipelineError>(), Some(PipelineError::ServerError { .. })) {
                    tracing::warn!(adapter = adapter.id, event = %event.source_event_id, "server error, cooling down {:?}", policy.server_error_cooldown);
                    tokio::time::sleep(policy.server_error_cooldown).await;
                }

                attempt += 1;
                if attempt < policy.max_retries {
                    retries += 1;
                    let backoff = jittered_backoff(policy, attempt);
                    tracing::warn!(adapter = adapter.id, event = %event.source_event_id, attempt, "scrape failed, retrying in {:?}: {e}", backoff);
                    tokio::time::sleep(backoff).await;
                } else {
                    return ScrapeOutcome { result: Err((e.to_string(), attempt)), requests, retries, rate_limit_hits };
                }
            }
        }
    }
}

fn jittered_backoff(policy: &RateLimitPolicy, attempt: u32) -> Duration {
    let base = policy.backoff_base * 2u32.saturating_pow(attempt.saturating_sub(1));
    let jitter_ms = rand::thread_rng().gen_range(0..250);
    (base + Duration::from_millis(jitter_ms)).clamp(policy.min_delay, policy.max_delay)
}

async fn staging_writer(pool: PgPool, mut rx: mpsc::Receiver<StagedMatch>) -> Result<u64> {
    let mut buffer = Vec::with_capacity(STAGING_BATCH_SIZE);
    let mut total = 0u64;

    while let Some(item) = rx.recv().await {
        buffer.push(item);
        if buffer.len() >= STAGING_BATCH_SIZE {
            total += db::insert_staged_batch(&pool, &buffer).await?;
            buffer.clear();
        }
    }
    if !buffer.is_empty() {
        total += db::insert_staged_batch(&pool, &buffer).await?;
    }
    Ok(total)
}

/// Appends this run's failures onto the persistent cross-run log rather
/// than overwriting it, so failures from earlier runs stay visible until a
/// maintenance op or operator clears them.
fn persist_failed_items(path: &Path, failures: &[FailedItem]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut existing: Vec<FailedItem> = fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default();
    existing.extend(failures.iter().map(|f| FailedItem {
        source_event_id: f.source_event_id.clone(),
        error: f.error.clone(),
        attempts: f.attempts,
        occurred_at: f.occurred_at,
    }));

    fs::write(path, serde_json::to_string_pretty(&existing)?)?;
    Ok(())
}
