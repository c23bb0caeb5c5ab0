use anyhow::Result;
use chrono::Utc;
use sqlx::{PgPool, Row};

use crate::models::StagedMatch;

fn row_to_staged(row: &sqlx::postgres::PgRow) -> StagedMatch {
    StagedMatch {
        source_match_key: row.get("source_match_key"),
        match_date: row.get("match_date"),
        match_time: row.get("match_time"),
        home_team_name: row.get("home_team_name"),
        away_team_name: row.get("away_team_name"),
        home_score: row.get("home_score"),
        away_score: row.get("away_score"),
        status: row.get("status"),
        location: row.get("location"),
        division: row.get("division"),
        gender: row.get("gender"),
        age_group: row.get("age_group"),
        event_name: row.get("event_name"),
        event_id: row.get("event_id"),
        source_platform: row.get("source_platform"),
        raw_data: row.get("raw_data"),
        processed: row.get("processed"),
        processed_at: row.get("processed_at"),
        error_message: row.get("error_message"),
        scraped_at: row.get("scraped_at"),
    }
}

/// Batched insert honoring the stager's exactly-once-per-key guarantee;
/// duplicates on `source_match_key` are silently dropped.
pub async fn insert_staged_batch(pool: &PgPool, batch: &[StagedMatch]) -> Result<u64> {
    if batch.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;
    for row in batch {
        let result = sqlx::query(
            r#"
            INSERT INTO staging_games
            (source_match_key, match_date, match_time, home_team_name, away_team_name,
             home_score, away_score, status, location, division, gender, age_group,
             event_name, event_id, source_platform, raw_data, processed, scraped_at)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,FALSE,$17)
            ON CONFLICT (source_match_key) DO NOTHING
            "#,
        )
        .bind(&row.source_match_key)
        .bind(row.match_date)
        .bind(row.match_time)
        .bind(&row.home_team_name)
        .bind(&row.away_team_name)
        .bind(row.home_score)
        .bind(row.away_score)
        .bind(row.status)
        .bind(&row.location)
        .bind(&row.division)
        .bind(row.gender)
        .bind(&row.age_group)
        .bind(&row.event_name)
        .bind(&row.event_id)
        .bind(&row.source_platform)
        .bind(&row.raw_data)
        .bind(row.scraped_at)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }
    tx.commit().await?;
    Ok(inserted)
}

pub async fn fetch_unprocessed_batch(
    pool: &PgPool,
    source_platform: Option<&str>,
    limit: i64,
) -> Result<Vec<StagedMatch>> {
    let rows = if let Some(source) = source_platform {
        sqlx::query(
            "SELECT * FROM staging_games WHERE NOT processed AND source_platform = $1 ORDER BY scraped_at LIMIT $2",
        )
        .bind(source)
        .bind(limit)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query("SELECT * FROM staging_games WHERE NOT processed ORDER BY scraped_at LIMIT $1")
            .bind(limit)
            .fetch_all(pool)
            .await?
    };
    Ok(rows.iter().map(row_to_staged).collect())
}

pub async fn get_staged_by_key(pool: &PgPool, source_match_key: &str) -> Result<Option<StagedMatch>> {
    let row = sqlx::query("SELECT * FROM staging_games WHERE source_match_key = $1")
        .bind(source_match_key)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_staged))
}

pub async fn mark_processed_ok(pool: &PgPool, source_match_key: &str) -> Result<()> {
    sqlx::query(
        "UPDATE staging_games SET processed = TRUE, processed_at = $2, error_message = NULL WHERE source_match_key = $1",
    )
    .bind(source_match_key)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_processed_error(pool: &PgPool, source_match_key: &str, error_message: &str) -> Result<()> {
    sqlx::query(
        "UPDATE staging_games SET processed = TRUE, processed_at = $2, error_message = $3 WHERE source_match_key = $1",
    )
    .bind(source_match_key)
    .bind(Utc::now())
    .bind(error_message)
    .execute(pool)
    .await?;
    Ok(())
}
