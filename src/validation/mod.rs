use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::fuzzy::{FuzzyMatcher, FuzzyMode, MatchDecision};
use crate::models::{AmbiguityField, Match, StagedMatch, Team};
use crate::resolver::season::season_year;
use crate::resolver::{find_or_create_event, infer_state, ResolutionCache, TeamResolver};

/// Aggressive-pass tuning: lower similarity floor and a small bounded
/// candidate set, restricted to the source's home state.
const AGGRESSIVE_THRESHOLD: f32 = 0.5;
const AGGRESSIVE_TOP_N: usize = 5;

#[derive(Debug)]
pub enum ValidationOutcome {
    Linked,
    Rejected(String),
    Ambiguous,
}

pub struct ValidationSummary {
    pub linked: usize,
    pub rejected: usize,
    pub ambiguous: usize,
    pub errored: usize,
}

/// Runs one validation pass: pulls a batch of unprocessed staged rows,
/// resolves each side's team and the event, rejects same-team matches,
/// and upserts the canonical match. The resolution cache and DB connection
/// are both scoped to this single run, never shared across runs.
pub async fn run(pool: &PgPool, source_platform: Option<&str>, limit: i64) -> Result<ValidationSummary> {
    let batch = db::fetch_unprocessed_batch(pool, source_platform, limit).await?;
    let mut cache = ResolutionCache::new();
    let mut summary = ValidationSummary { linked: 0, rejected: 0, ambiguous: 0, errored: 0 };

    for staged in &batch {
        match process_one(pool, staged, &mut cache).await {
            Ok(ValidationOutcome::Linked) => {
                db::mark_processed_ok(pool, &staged.source_match_key).await?;
                summary.linked += 1;
            }
            Ok(ValidationOutcome::Ambiguous) => {
                // Queued for manual review; not reprocessed on the next run.
                db::mark_processed_ok(pool, &staged.source_match_key).await?;
                summary.ambiguous += 1;
            }
            Ok(ValidationOutcome::Rejected(reason)) => {
                db::mark_processed_error(pool, &staged.source_match_key, &reason).await?;
                summary.rejected += 1;
            }
            Err(e) => {
                db::mark_processed_error(pool, &staged.source_match_key, &e.to_string()).await?;
                summary.errored += 1;
            }
        }
    }

    Ok(summary)
}

async fn process_one(
    pool: &PgPool,
    staged: &StagedMatch,
    cache: &mut ResolutionCache,
) -> Result<ValidationOutcome> {
    let home_name = staged.home_team_name.trim();
    let away_name = staged.away_team_name.trim();
    if home_name.is_empty() || away_name.is_empty() {
        return Ok(ValidationOutcome::Rejected("home or away team name is empty".into()));
    }
    if home_name.eq_ignore_ascii_case(away_name) {
        return Ok(ValidationOutcome::Rejected("home and away team names are not distinct".into()));
    }
    // match_date is a non-optional NaiveDate on StagedMatch, so an
    // unparseable date never reaches this point -- adapters reject it at
    // scrape time.

    let season_year = season_year(staged.match_date);
    let season = db::ensure_current_season(
        pool,
        season_year,
        chrono::NaiveDate::from_ymd_opt(season_year - 1, 8, 1).unwrap_or(staged.match_date),
        chrono::NaiveDate::from_ymd_opt(season_year, 7, 31).unwrap_or(staged.match_date),
    )
    .await?;

    let home = match resolve_team(
        pool,
        &staged.home_team_name,
        &staged.source_platform,
        staged.source_match_key.clone(),
        AmbiguityField::Home,
        cache,
        season_year,
    )
    .await?
    {
        Resolved::Team(t) => t,
        Resolved::Queued => return Ok(ValidationOutcome::Ambiguous),
    };

    let away = match resolve_team(
        pool,
        &staged.away_team_name,
        &staged.source_platform,
        staged.source_match_key.clone(),
        AmbiguityField::Away,
        cache,
        season_year,
    )
    .await?
    {
        Resolved::Team(t) => t,
        Resolved::Queued => return Ok(ValidationOutcome::Ambiguous),
    };

    if home.id == away.id {
        return Ok(ValidationOutcome::Rejected("home and away resolved to the same team".into()));
    }

    let event = find_or_create_event(
        pool,
        staged.event_id.as_deref(),
        staged.event_name.as_deref().unwrap_or("Unknown Event"),
        None,
        &staged.source_platform,
        season.id,
    )
    .await?;

    let m = Match {
        id: db::get_match_by_source_key(pool, &staged.source_match_key)
            .await?
            .map(|existing| existing.id)
            .unwrap_or_else(Uuid::new_v4),
        match_date: staged.match_date,
        match_time: staged.match_time,
        home_team_id: home.id,
        away_team_id: away.id,
        home_score: staged.home_score,
        away_score: staged.away_score,
        league_id: if event.event_type == crate::models::EventType::League { Some(event.id) } else { None },
        tournament_id: if event.event_type == crate::models::EventType::Tournament { Some(event.id) } else { None },
        venue_id: None,
        source_platform: staged.source_platform.clone(),
        source_match_key: staged.source_match_key.clone(),
        deleted_at: None,
        deleted_reason: None,
        updated_at: chrono::Utc::now(),
    };

    db::upsert_match(pool, &m).await?;
    Ok(ValidationOutcome::Linked)
}

enum Resolved {
    Team(Team),
    Queued,
}

async fn resolve_team(
    pool: &PgPool,
    raw_name: &str,
    source_platform: &str,
    match_source_key: String,
    field: AmbiguityField,
    cache: &mut ResolutionCache,
    season_year: i32,
) -> Result<Resolved> {
    let matcher = FuzzyMatcher::new(pool);

    if let Some(team_id) = matcher.phase1_exact(raw_name).await? {
        if let Some(team) = db::get_team_by_id(pool, team_id).await? {
            return Ok(Resolved::Team(team));
        }
    }
    if let Some(team_id) = matcher.phase2_normalized(raw_name).await? {
        if let Some(team) = db::get_team_by_id(pool, team_id).await? {
            return Ok(Resolved::Team(team));
        }
    }

    match matcher.phase3_fuzzy(raw_name, FuzzyMode::Standard).await? {
        MatchDecision::Linked(team_id) => {
            if let Some(team) = db::get_team_by_id(pool, team_id).await? {
                return Ok(Resolved::Team(team));
            }
        }
        MatchDecision::Ambiguous { candidate_1, candidate_2 } => {
            db::insert_ambiguity_entry(
                pool,
                &match_source_key,
                field,
                raw_name,
                candidate_1.0,
                candidate_1.1,
                candidate_2.0,
                candidate_2.1,
            )
            .await?;
            return Ok(Resolved::Queued);
        }
        MatchDecision::NoCandidate => {}
    }

    // Standard-threshold phases found nothing; run one aggressive pass
    // restricted to the source's home state before giving up and creating
    // a new team.
    let aggressive_mode = FuzzyMode::Aggressive {
        threshold: AGGRESSIVE_THRESHOLD,
        top_n: AGGRESSIVE_TOP_N,
        state: Some(infer_state(source_platform).to_string()),
    };
    match matcher.phase3_fuzzy(raw_name, aggressive_mode).await? {
        MatchDecision::Linked(team_id) => {
            if let Some(team) = db::get_team_by_id(pool, team_id).await? {
                return Ok(Resolved::Team(team));
            }
        }
        MatchDecision::Ambiguous { candidate_1, candidate_2 } => {
            db::insert_ambiguity_entry(
                pool,
                &match_source_key,
                field,
                raw_name,
                candidate_1.0,
                candidate_1.1,
                candidate_2.0,
                candidate_2.1,
            )
            .await?;
            return Ok(Resolved::Queued);
        }
        MatchDecision::NoCandidate => {}
    }

    let mut resolver = TeamResolver::new(pool, cache, season_year);
    let team = resolver.find_or_create_team(raw_name, source_platform).await?;
    Ok(Resolved::Team(team))
}
