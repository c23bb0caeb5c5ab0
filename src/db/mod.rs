pub mod aliases;
pub mod ambiguity;
pub mod events;
pub mod matches;
pub mod rank_history;
pub mod seasons;
pub mod staging;
pub mod teams;

pub use aliases::*;
pub use ambiguity::*;
pub use events::*;
pub use matches::*;
pub use rank_history::*;
pub use seasons::*;
pub use staging::*;
pub use teams::*;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Opens the pool against `DATABASE_URL`. Mirrors the teacher's
/// `create_pool`, targeting PostgreSQL instead of a local sqlite file since
/// the fuzzy matcher's trigram lookups need `pg_trgm`.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Creates the extension, tables, and indexes if they don't already exist.
/// Idempotent, safe to call on every startup the way the teacher's
/// `init_database_with_pool` is.
pub async fn init_database_with_pool(pool: &PgPool) -> Result<()> {
    sqlx::query("CREATE EXTENSION IF NOT EXISTS pg_trgm")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS seasons (
            id UUID PRIMARY KEY,
            year INTEGER NOT NULL UNIQUE,
            start_date DATE NOT NULL,
            end_date DATE NOT NULL,
            is_current BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id UUID PRIMARY KEY,
            display_name TEXT NOT NULL,
            canonical_name TEXT NOT NULL,
            birth_year INTEGER,
            gender TEXT NOT NULL DEFAULT 'unknown',
            age_group TEXT,
            state TEXT NOT NULL DEFAULT 'unknown',
            club_id UUID,
            elo_rating DOUBLE PRECISION NOT NULL DEFAULT 1500.0,
            wins INTEGER NOT NULL DEFAULT 0,
            losses INTEGER NOT NULL DEFAULT 0,
            draws INTEGER NOT NULL DEFAULT 0,
            matches_played INTEGER NOT NULL DEFAULT 0,
            last_match_date DATE,
            elo_national_rank INTEGER,
            elo_state_rank INTEGER,
            data_quality_score DOUBLE PRECISION NOT NULL DEFAULT 0.0,
            birth_year_source TEXT,
            gender_source TEXT,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (canonical_name, birth_year, gender, state)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leagues (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            source_event_id TEXT,
            source_platform TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT 'unknown',
            season_id UUID NOT NULL REFERENCES seasons(id),
            UNIQUE (name, season_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tournaments (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            source_event_id TEXT,
            source_platform TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT 'unknown',
            season_id UUID NOT NULL REFERENCES seasons(id),
            start_date DATE NOT NULL,
            end_date DATE NOT NULL,
            UNIQUE (name, season_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            id UUID PRIMARY KEY,
            match_date DATE NOT NULL,
            match_time TIME,
            home_team_id UUID NOT NULL REFERENCES teams(id),
            away_team_id UUID NOT NULL REFERENCES teams(id),
            home_score INTEGER,
            away_score INTEGER,
            league_id UUID REFERENCES leagues(id),
            tournament_id UUID REFERENCES tournaments(id),
            venue_id UUID,
            source_platform TEXT NOT NULL,
            source_match_key TEXT NOT NULL UNIQUE,
            deleted_at TIMESTAMPTZ,
            deleted_reason TEXT,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            CHECK (home_team_id <> away_team_id),
            CHECK (league_id IS NULL OR tournament_id IS NULL)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_name_aliases (
            id UUID PRIMARY KEY,
            team_id UUID NOT NULL REFERENCES teams(id),
            alias_name TEXT NOT NULL,
            source TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (team_id, alias_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_aliases_trgm ON team_name_aliases USING GIN (alias_name gin_trgm_ops)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rank_history (
            team_id UUID NOT NULL REFERENCES teams(id),
            snapshot_date DATE NOT NULL,
            elo_rating DOUBLE PRECISION NOT NULL,
            elo_national_rank INTEGER,
            elo_state_rank INTEGER,
            PRIMARY KEY (team_id, snapshot_date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ambiguous_match_queue (
            id UUID PRIMARY KEY,
            match_source_key TEXT NOT NULL,
            field_type TEXT NOT NULL,
            raw_name TEXT NOT NULL,
            candidate_1_team UUID NOT NULL REFERENCES teams(id),
            candidate_1_sim DOUBLE PRECISION NOT NULL,
            candidate_2_team UUID NOT NULL REFERENCES teams(id),
            candidate_2_sim DOUBLE PRECISION NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            resolved_team UUID,
            resolved_by TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            resolved_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS staging_games (
            source_match_key TEXT PRIMARY KEY,
            match_date DATE NOT NULL,
            match_time TIME,
            home_team_name TEXT NOT NULL,
            away_team_name TEXT NOT NULL,
            home_score INTEGER,
            away_score INTEGER,
            status TEXT NOT NULL DEFAULT 'scheduled',
            location TEXT,
            division TEXT,
            gender TEXT,
            age_group TEXT,
            event_name TEXT,
            event_id TEXT,
            source_platform TEXT NOT NULL,
            raw_data JSONB NOT NULL,
            processed BOOLEAN NOT NULL DEFAULT FALSE,
            processed_at TIMESTAMPTZ,
            error_message TEXT,
            scraped_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_staging_unprocessed ON staging_games(processed) WHERE NOT processed")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(match_date)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_teams_birth_gender ON teams(birth_year, gender)")
        .execute(pool)
        .await?;

    tracing::info!("database schema ready");
    Ok(())
}
