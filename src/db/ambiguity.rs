use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{AmbiguityField, AmbiguityQueueEntry, AmbiguityStatus};

fn field_str(f: AmbiguityField) -> &'static str {
    match f {
        AmbiguityField::Home => "home",
        AmbiguityField::Away => "away",
    }
}

fn row_to_entry(row: &sqlx::postgres::PgRow) -> AmbiguityQueueEntry {
    AmbiguityQueueEntry {
        id: row.get("id"),
        match_source_key: row.get("match_source_key"),
        field_type: match row.get::<String, _>("field_type").as_str() {
            "home" => AmbiguityField::Home,
            _ => AmbiguityField::Away,
        },
        raw_name: row.get("raw_name"),
        candidate_1_team: row.get("candidate_1_team"),
        candidate_1_sim: row.get("candidate_1_sim"),
        candidate_2_team: row.get("candidate_2_team"),
        candidate_2_sim: row.get("candidate_2_sim"),
        status: match row.get::<String, _>("status").as_str() {
            "resolved" => AmbiguityStatus::Resolved,
            "dismissed" => AmbiguityStatus::Dismissed,
            _ => AmbiguityStatus::Pending,
        },
        resolved_team: row.get("resolved_team"),
        resolved_by: row.get("resolved_by"),
        created_at: row.get("created_at"),
        resolved_at: row.get("resolved_at"),
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_ambiguity_entry(
    pool: &PgPool,
    match_source_key: &str,
    field_type: AmbiguityField,
    raw_name: &str,
    candidate_1_team: Uuid,
    candidate_1_sim: f64,
    candidate_2_team: Uuid,
    candidate_2_sim: f64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO ambiguous_match_queue
        (id, match_source_key, field_type, raw_name, candidate_1_team, candidate_1_sim,
         candidate_2_team, candidate_2_sim, status)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,'pending')
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(match_source_key)
    .bind(field_str(field_type))
    .bind(raw_name)
    .bind(candidate_1_team)
    .bind(candidate_1_sim)
    .bind(candidate_2_team)
    .bind(candidate_2_sim)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_pending(pool: &PgPool, limit: i64) -> Result<Vec<AmbiguityQueueEntry>> {
    let rows = sqlx::query(
        "SELECT * FROM ambiguous_match_queue WHERE status = 'pending' ORDER BY created_at LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_entry).collect())
}

pub async fn resolve(pool: &PgPool, entry_id: Uuid, team_id: Uuid, resolved_by: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE ambiguous_match_queue
        SET status = 'resolved', resolved_team = $2, resolved_by = $3, resolved_at = now()
        WHERE id = $1
        "#,
    )
    .bind(entry_id)
    .bind(team_id)
    .bind(resolved_by)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn dismiss(pool: &PgPool, entry_id: Uuid, resolved_by: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE ambiguous_match_queue
        SET status = 'dismissed', resolved_by = $2, resolved_at = now()
        WHERE id = $1
        "#,
    )
    .bind(entry_id)
    .bind(resolved_by)
    .execute(pool)
    .await?;
    Ok(())
}
