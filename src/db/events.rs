use anyhow::Result;
use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{Event, EventType};

fn event_type_str(t: EventType) -> &'static str {
    match t {
        EventType::League => "league",
        EventType::Tournament => "tournament",
    }
}

/// Find by `(source_event_id, type)` when an id is present, else
/// case-insensitive by `(name, season_id, type)`.
pub async fn find_event(
    pool: &PgPool,
    event_type: EventType,
    source_event_id: Option<&str>,
    name: &str,
    season_id: Uuid,
) -> Result<Option<Event>> {
    let table = table_for(event_type);

    if let Some(source_id) = source_event_id {
        let row = sqlx::query(&format!(
            "SELECT * FROM {} WHERE source_event_id = $1",
            table
        ))
        .bind(source_id)
        .fetch_optional(pool)
        .await?;
        if let Some(row) = row {
            return Ok(Some(row_to_event(&row, event_type)));
        }
    }

    let row = sqlx::query(&format!(
        "SELECT * FROM {} WHERE name ILIKE $1 AND season_id = $2",
        table
    ))
    .bind(name)
    .bind(season_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| row_to_event(&r, event_type)))
}

pub async fn create_event(
    pool: &PgPool,
    event_type: EventType,
    name: &str,
    state: &str,
    season_id: Uuid,
    source_event_id: Option<&str>,
    source_platform: &str,
    start_date: Option<chrono::NaiveDate>,
    end_date: Option<chrono::NaiveDate>,
) -> Result<Event> {
    let id = Uuid::new_v4();
    let table = table_for(event_type);

    if event_type == EventType::Tournament {
        // Tournaments require dates; unknown values fall back to today as a
        // placeholder, as specified.
        let today = Utc::now().date_naive();
        let start = start_date.unwrap_or(today);
        let end = end_date.unwrap_or(today);
        sqlx::query(&format!(
            "INSERT INTO {} (id, name, source_event_id, source_platform, state, season_id, start_date, end_date)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
            table
        ))
        .bind(id)
        .bind(name)
        .bind(source_event_id)
        .bind(source_platform)
        .bind(state)
        .bind(season_id)
        .bind(start)
        .bind(end)
        .execute(pool)
        .await?;

        Ok(Event {
            id,
            event_type,
            name: name.to_string(),
            state: state.to_string(),
            season_id,
            source_event_id: source_event_id.map(str::to_string),
            source_platform: source_platform.to_string(),
            start_date: Some(start),
            end_date: Some(end),
        })
    } else {
        sqlx::query(&format!(
            "INSERT INTO {} (id, name, source_event_id, source_platform, state, season_id)
             VALUES ($1,$2,$3,$4,$5,$6)",
            table
        ))
        .bind(id)
        .bind(name)
        .bind(source_event_id)
        .bind(source_platform)
        .bind(state)
        .bind(season_id)
        .execute(pool)
        .await?;

        Ok(Event {
            id,
            event_type,
            name: name.to_string(),
            state: state.to_string(),
            season_id,
            source_event_id: source_event_id.map(str::to_string),
            source_platform: source_platform.to_string(),
            start_date: None,
            end_date: None,
        })
    }
}

fn table_for(event_type: EventType) -> &'static str {
    match event_type {
        EventType::League => "leagues",
        EventType::Tournament => "tournaments",
    }
}

fn row_to_event(row: &sqlx::postgres::PgRow, event_type: EventType) -> Event {
    Event {
        id: row.get("id"),
        event_type,
        name: row.get("name"),
        state: row.get("state"),
        season_id: row.get("season_id"),
        source_event_id: row.get("source_event_id"),
        source_platform: row.get("source_platform"),
        start_date: row.try_get("start_date").ok(),
        end_date: row.try_get("end_date").ok(),
    }
}

pub fn event_type_str_pub(t: EventType) -> &'static str {
    event_type_str(t)
}
