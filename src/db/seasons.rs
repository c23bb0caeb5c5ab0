use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::Season;

fn row_to_season(row: &sqlx::postgres::PgRow) -> Season {
    Season {
        id: row.get("id"),
        year: row.get("year"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        is_current: row.get("is_current"),
    }
}

pub async fn get_current_season(pool: &PgPool) -> Result<Option<Season>> {
    let row = sqlx::query("SELECT * FROM seasons WHERE is_current = TRUE LIMIT 1")
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_season))
}

pub async fn get_season_by_year(pool: &PgPool, year: i32) -> Result<Option<Season>> {
    let row = sqlx::query("SELECT * FROM seasons WHERE year = $1")
        .bind(year)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_season))
}

/// Ensures exactly one `is_current` row exists for `year`, creating it if
/// absent and clearing any previous current flag.
pub async fn ensure_current_season(
    pool: &PgPool,
    year: i32,
    start_date: chrono::NaiveDate,
    end_date: chrono::NaiveDate,
) -> Result<Season> {
    if let Some(existing) = get_season_by_year(pool, year).await? {
        if !existing.is_current {
            sqlx::query("UPDATE seasons SET is_current = FALSE").execute(pool).await?;
            sqlx::query("UPDATE seasons SET is_current = TRUE WHERE id = $1")
                .bind(existing.id)
                .execute(pool)
                .await?;
        }
        return Ok(existing);
    }

    let id = Uuid::new_v4();
    sqlx::query("UPDATE seasons SET is_current = FALSE").execute(pool).await?;
    sqlx::query(
        "INSERT INTO seasons (id, year, start_date, end_date, is_current) VALUES ($1,$2,$3,$4,TRUE)",
    )
    .bind(id)
    .bind(year)
    .bind(start_date)
    .bind(end_date)
    .execute(pool)
    .await?;

    Ok(Season {
        id,
        year,
        start_date,
        end_date,
        is_current: true,
    })
}
