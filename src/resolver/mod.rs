pub mod name_parser;
pub mod season;

use std::collections::HashMap;

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::models::{Event, EventType, Gender, Team};

const STARTING_ELO: f64 = 1500.0;

/// Per-run cache keyed by `(raw_name, source_platform)`, scoped to a single
/// validation run and discarded on process exit — never a shared or global
/// store, since the scheduling model here is single-threaded per run.
#[derive(Default)]
pub struct ResolutionCache {
    teams: HashMap<(String, String), Uuid>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Infers a default state for newly created teams from the adapter's
/// source platform. Heartland-region platforms default to Kansas;
/// national platforms default to Unknown, per the resolver's rules.
pub fn infer_state(source_platform: &str) -> &'static str {
    match source_platform {
        "heartland" | "ks-youth-soccer" => "KS",
        _ => "unknown",
    }
}

pub struct TeamResolver<'a> {
    pool: &'a PgPool,
    cache: &'a mut ResolutionCache,
    season_year: i32,
}

impl<'a> TeamResolver<'a> {
    pub fn new(pool: &'a PgPool, cache: &'a mut ResolutionCache, season_year: i32) -> Self {
        Self { pool, cache, season_year }
    }

    /// Finds or creates a canonical team for a raw name as seen from one
    /// source platform. Implements the resolver's full lookup order:
    /// cache -> Level 1 -> Level 2 -> create.
    pub async fn find_or_create_team(&mut self, raw_name: &str, source_platform: &str) -> Result<Team> {
        let cache_key = (raw_name.to_string(), source_platform.to_string());
        if let Some(&id) = self.cache.teams.get(&cache_key) {
            if let Some(team) = db::get_team_by_id(self.pool, id).await? {
                return Ok(team);
            }
        }

        let meta = name_parser::parse_team_name(raw_name, self.season_year);

        let level1 = db::find_team_level1(self.pool, &meta.canonical_name, meta.birth_year).await?;
        if level1.len() == 1 {
            self.cache.teams.insert(cache_key, level1[0].id);
            return Ok(level1.into_iter().next().unwrap());
        }

        if level1.is_empty() {
            let parts = name_parser::key_parts(&meta.canonical_name);
            if parts.len() >= 2 {
                let candidates = db::find_team_level2_candidates(self.pool, &parts, meta.birth_year).await?;
                let mut best: Option<(Team, f64)> = None;
                for candidate in candidates {
                    let score = name_parser::level2_score(
                        &parts,
                        &candidate.canonical_name,
                        meta.birth_year,
                        candidate.birth_year,
                    );
                    if best.as_ref().map(|(_, s)| score > *s).unwrap_or(true) {
                        best = Some((candidate, score));
                    }
                }
                if let Some((team, score)) = best {
                    if score >= 0.6 {
                        self.cache.teams.insert(cache_key, team.id);
                        return Ok(team);
                    }
                }
            }
        }

        let state = infer_state(source_platform);
        let birth_year_source = match meta.birth_year_flag {
            crate::models::DataFlag::Parsed4Digit => Some("parsed_4digit"),
            crate::models::DataFlag::Parsed2Digit => Some("parsed_2digit"),
            crate::models::DataFlag::ParsedAgeGroup => Some("parsed_age_group"),
            crate::models::DataFlag::InferredFromSource => Some("inferred_from_source"),
            crate::models::DataFlag::Unknown => None,
        };
        let gender_source = if matches!(meta.gender, Gender::Unknown) { None } else { Some("parsed_from_name") };

        match db::insert_team_new(
            self.pool,
            raw_name,
            &meta.canonical_name,
            meta.birth_year,
            meta.gender,
            meta.age_group.as_deref(),
            state,
            STARTING_ELO,
            birth_year_source,
            gender_source,
        )
        .await
        {
            Ok(team) => {
                self.cache.teams.insert(cache_key, team.id);
                Ok(team)
            }
            Err(e) => {
                // Duplicate-creation collision on the unique constraint: retry
                // the Level 1 lookup and reuse the row another writer created.
                let retry = db::find_team_level1(self.pool, &meta.canonical_name, meta.birth_year).await?;
                if let Some(team) = retry.into_iter().next() {
                    self.cache.teams.insert(cache_key, team.id);
                    Ok(team)
                } else {
                    Err(e)
                }
            }
        }
    }
}

/// Resolves or creates an event. Type is league if the hint says so or the
/// name contains "league"; otherwise tournament.
pub async fn find_or_create_event(
    pool: &PgPool,
    source_event_id: Option<&str>,
    event_name: &str,
    type_hint: Option<&str>,
    source_platform: &str,
    season_id: Uuid,
) -> Result<Event> {
    let event_type = if type_hint == Some("league") || event_name.to_lowercase().contains("league") {
        EventType::League
    } else {
        EventType::Tournament
    };

    if let Some(event) = db::find_event(pool, event_type, source_event_id, event_name, season_id).await? {
        return Ok(event);
    }

    db::create_event(
        pool,
        event_type,
        event_name,
        "unknown",
        season_id,
        source_event_id,
        source_platform,
        None,
        None,
    )
    .await
}
