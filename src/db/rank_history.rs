use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::RankHistorySnapshot;

/// Upsert on `(team, date)`, written during chronological replay after each
/// match — the latest rating seen for that team on that date.
pub async fn upsert_rank_history(
    pool: &PgPool,
    team_id: Uuid,
    snapshot_date: chrono::NaiveDate,
    elo_rating: f64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rank_history (team_id, snapshot_date, elo_rating)
        VALUES ($1, $2, $3)
        ON CONFLICT (team_id, snapshot_date) DO UPDATE SET elo_rating = excluded.elo_rating
        "#,
    )
    .bind(team_id)
    .bind(snapshot_date)
    .bind(elo_rating)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_national_rank(pool: &PgPool, team_id: Uuid, rank: i32) -> Result<()> {
    sqlx::query("UPDATE teams SET elo_national_rank = $2 WHERE id = $1")
        .bind(team_id)
        .bind(rank)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_state_rank(pool: &PgPool, team_id: Uuid, rank: i32) -> Result<()> {
    sqlx::query("UPDATE teams SET elo_state_rank = $2 WHERE id = $1")
        .bind(team_id)
        .bind(rank)
        .execute(pool)
        .await?;
    Ok(())
}

/// Bulk update of every historical snapshot's national rank for one
/// `(group, date)`, in a single statement keyed by `UNNEST` arrays rather
/// than a per-row round trip — the point is to push the work into the
/// database, per the maintenance ops' large-SQL-template convention.
pub async fn bulk_update_snapshot_national_ranks(
    pool: &PgPool,
    snapshot_date: chrono::NaiveDate,
    ranks: &[(Uuid, i32)],
) -> Result<()> {
    if ranks.is_empty() {
        return Ok(());
    }
    let (team_ids, values): (Vec<Uuid>, Vec<i32>) = ranks.iter().cloned().unzip();
    sqlx::query(
        r#"
        UPDATE rank_history AS rh SET elo_national_rank = u.rank
        FROM UNNEST($2::uuid[], $3::int[]) AS u(team_id, rank)
        WHERE rh.team_id = u.team_id AND rh.snapshot_date = $1
        "#,
    )
    .bind(snapshot_date)
    .bind(&team_ids)
    .bind(&values)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn bulk_update_snapshot_state_ranks(
    pool: &PgPool,
    snapshot_date: chrono::NaiveDate,
    ranks: &[(Uuid, i32)],
) -> Result<()> {
    if ranks.is_empty() {
        return Ok(());
    }
    let (team_ids, values): (Vec<Uuid>, Vec<i32>) = ranks.iter().cloned().unzip();
    sqlx::query(
        r#"
        UPDATE rank_history AS rh SET elo_state_rank = u.rank
        FROM UNNEST($2::uuid[], $3::int[]) AS u(team_id, rank)
        WHERE rh.team_id = u.team_id AND rh.snapshot_date = $1
        "#,
    )
    .bind(snapshot_date)
    .bind(&team_ids)
    .bind(&values)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_team_history(pool: &PgPool, team_id: Uuid) -> Result<Vec<RankHistorySnapshot>> {
    let rows = sqlx::query(
        "SELECT * FROM rank_history WHERE team_id = $1 ORDER BY snapshot_date ASC",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| RankHistorySnapshot {
            team_id: row.get("team_id"),
            snapshot_date: row.get("snapshot_date"),
            elo_rating: row.get("elo_rating"),
            elo_national_rank: row.get("elo_national_rank"),
            elo_state_rank: row.get("elo_state_rank"),
        })
        .collect())
}

/// All distinct snapshot dates for a group, used by backfill to re-rank
/// every historical day after a chronological replay.
pub async fn distinct_snapshot_dates(pool: &PgPool) -> Result<Vec<chrono::NaiveDate>> {
    let rows = sqlx::query("SELECT DISTINCT snapshot_date FROM rank_history ORDER BY snapshot_date")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|r| r.get("snapshot_date")).collect())
}
