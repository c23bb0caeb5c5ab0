use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::Match;

fn row_to_match(row: &sqlx::postgres::PgRow) -> Match {
    Match {
        id: row.get("id"),
        match_date: row.get("match_date"),
        match_time: row.get("match_time"),
        home_team_id: row.get("home_team_id"),
        away_team_id: row.get("away_team_id"),
        home_score: row.get("home_score"),
        away_score: row.get("away_score"),
        league_id: row.get("league_id"),
        tournament_id: row.get("tournament_id"),
        venue_id: row.get("venue_id"),
        source_platform: row.get("source_platform"),
        source_match_key: row.get("source_match_key"),
        deleted_at: row.get("deleted_at"),
        deleted_reason: row.get("deleted_reason"),
        updated_at: row.get("updated_at"),
    }
}

/// Batch upsert of canonical matches keyed by `source_match_key`, per the
/// validation pipeline's write contract.
pub async fn upsert_match(pool: &PgPool, m: &Match) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO matches
        (id, match_date, match_time, home_team_id, away_team_id, home_score, away_score,
         league_id, tournament_id, venue_id, source_platform, source_match_key, updated_at)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12, now())
        ON CONFLICT (source_match_key) DO UPDATE SET
            match_date = excluded.match_date,
            match_time = excluded.match_time,
            home_team_id = excluded.home_team_id,
            away_team_id = excluded.away_team_id,
            home_score = excluded.home_score,
            away_score = excluded.away_score,
            league_id = excluded.league_id,
            tournament_id = excluded.tournament_id,
            venue_id = excluded.venue_id,
            updated_at = now()
        "#,
    )
    .bind(m.id)
    .bind(m.match_date)
    .bind(m.match_time)
    .bind(m.home_team_id)
    .bind(m.away_team_id)
    .bind(m.home_score)
    .bind(m.away_score)
    .bind(m.league_id)
    .bind(m.tournament_id)
    .bind(m.venue_id)
    .bind(&m.source_platform)
    .bind(&m.source_match_key)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_match_by_source_key(pool: &PgPool, source_match_key: &str) -> Result<Option<Match>> {
    let row = sqlx::query("SELECT * FROM matches WHERE source_match_key = $1")
        .bind(source_match_key)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_match))
}

/// Completed current-season matches in chronological order, for ELO replay.
/// Total order is `(match_date asc, id asc)`, the only component requiring it.
pub async fn completed_matches_chronological(
    pool: &PgPool,
    season_start: chrono::NaiveDate,
    season_end: chrono::NaiveDate,
) -> Result<Vec<Match>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM matches
        WHERE deleted_at IS NULL
          AND home_score IS NOT NULL AND away_score IS NOT NULL
          AND match_date BETWEEN $1 AND $2
        ORDER BY match_date ASC, id ASC
        "#,
    )
    .bind(season_start)
    .bind(season_end)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_match).collect())
}

pub async fn matches_with_null_event_and_source_key(pool: &PgPool, limit: i64) -> Result<Vec<Match>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM matches
        WHERE deleted_at IS NULL AND league_id IS NULL AND tournament_id IS NULL
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_match).collect())
}

pub async fn attach_league(pool: &PgPool, match_id: Uuid, league_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE matches SET league_id = $2, updated_at = now() WHERE id = $1")
        .bind(match_id)
        .bind(league_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn attach_tournament(pool: &PgPool, match_id: Uuid, tournament_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE matches SET tournament_id = $2, updated_at = now() WHERE id = $1")
        .bind(match_id)
        .bind(tournament_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn soft_delete_match(pool: &PgPool, match_id: Uuid, reason: &str) -> Result<()> {
    sqlx::query(
        "UPDATE matches SET deleted_at = now(), deleted_reason = $2 WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(match_id)
    .bind(reason)
    .execute(pool)
    .await?;
    Ok(())
}

/// Live matches involving either of two teams, used by birth-year repair to
/// find merge conflicts before repointing one team's matches onto the other.
pub async fn live_matches_for_teams(pool: &PgPool, team_a: Uuid, team_b: Uuid) -> Result<Vec<Match>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM matches
        WHERE deleted_at IS NULL
          AND (home_team_id IN ($1, $2) OR away_team_id IN ($1, $2))
        "#,
    )
    .bind(team_a)
    .bind(team_b)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_match).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Match {
        Match {
            id: Uuid::new_v4(),
            match_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            match_time: None,
            home_team_id: Uuid::new_v4(),
            away_team_id: Uuid::new_v4(),
            home_score: Some(2),
            away_score: Some(1),
            league_id: None,
            tournament_id: None,
            venue_id: None,
            source_platform: "heartland".to_string(),
            source_match_key: "heartland-e1-m1".to_string(),
            deleted_at: None,
            deleted_reason: None,
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn completed_match_has_both_scores() {
        assert!(sample().is_completed());
    }

    #[test]
    fn scheduled_match_has_no_scores() {
        let mut m = sample();
        m.home_score = None;
        m.away_score = None;
        assert!(!m.is_completed());
    }
}
