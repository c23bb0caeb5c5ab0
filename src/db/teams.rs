use anyhow::Result;
use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{Gender, Team};

fn gender_str(g: Gender) -> &'static str {
    match g {
        Gender::Male => "male",
        Gender::Female => "female",
        Gender::Unknown => "unknown",
    }
}

fn gender_from_str(s: &str) -> Gender {
    match s {
        "male" => Gender::Male,
        "female" => Gender::Female,
        _ => Gender::Unknown,
    }
}

fn row_to_team(row: &sqlx::postgres::PgRow) -> Team {
    Team {
        id: row.get("id"),
        display_name: row.get("display_name"),
        canonical_name: row.get("canonical_name"),
        birth_year: row.get("birth_year"),
        gender: gender_from_str(row.get::<String, _>("gender").as_str()),
        age_group: row.get("age_group"),
        state: row.get("state"),
        club_id: row.get("club_id"),
        elo_rating: row.get("elo_rating"),
        wins: row.get("wins"),
        losses: row.get("losses"),
        draws: row.get("draws"),
        matches_played: row.get("matches_played"),
        last_match_date: row.get("last_match_date"),
        data_quality_score: row.get("data_quality_score"),
        birth_year_source: row.get("birth_year_source"),
        gender_source: row.get("gender_source"),
        updated_at: row.get("updated_at"),
    }
}

pub async fn insert_team(pool: &PgPool, team: &Team) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO teams
        (id, display_name, canonical_name, birth_year, gender, age_group, state, club_id,
         elo_rating, wins, losses, draws, matches_played, last_match_date,
         data_quality_score, birth_year_source, gender_source, updated_at)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18)
        ON CONFLICT (id) DO UPDATE SET
            display_name = excluded.display_name,
            canonical_name = excluded.canonical_name,
            birth_year = excluded.birth_year,
            gender = excluded.gender,
            age_group = excluded.age_group,
            state = excluded.state,
            club_id = excluded.club_id,
            elo_rating = excluded.elo_rating,
            wins = excluded.wins,
            losses = excluded.losses,
            draws = excluded.draws,
            matches_played = excluded.matches_played,
            last_match_date = excluded.last_match_date,
            data_quality_score = excluded.data_quality_score,
            birth_year_source = excluded.birth_year_source,
            gender_source = excluded.gender_source,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(team.id)
    .bind(&team.display_name)
    .bind(&team.canonical_name)
    .bind(team.birth_year)
    .bind(gender_str(team.gender))
    .bind(&team.age_group)
    .bind(&team.state)
    .bind(team.club_id)
    .bind(team.elo_rating)
    .bind(team.wins)
    .bind(team.losses)
    .bind(team.draws)
    .bind(team.matches_played)
    .bind(team.last_match_date)
    .bind(team.data_quality_score)
    .bind(&team.birth_year_source)
    .bind(&team.gender_source)
    .bind(team.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_team_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Team>> {
    let row = sqlx::query("SELECT * FROM teams WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_team))
}

/// Level 1 lookup: case-insensitive equality on `canonical_name`, optionally
/// filtered by `birth_year` when known.
pub async fn find_team_level1(
    pool: &PgPool,
    canonical_name: &str,
    birth_year: Option<i32>,
) -> Result<Vec<Team>> {
    let rows = if let Some(year) = birth_year {
        sqlx::query("SELECT * FROM teams WHERE canonical_name = $1 AND birth_year = $2")
            .bind(canonical_name)
            .bind(year)
            .fetch_all(pool)
            .await?
    } else {
        sqlx::query("SELECT * FROM teams WHERE canonical_name = $1")
            .bind(canonical_name)
            .fetch_all(pool)
            .await?
    };
    Ok(rows.iter().map(row_to_team).collect())
}

/// Level 2 lookup candidates: canonical names containing all key parts,
/// matched on `birth_year` when known. The caller scores and ranks these.
pub async fn find_team_level2_candidates(
    pool: &PgPool,
    key_parts: &[String],
    birth_year: Option<i32>,
) -> Result<Vec<Team>> {
    if key_parts.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = String::from("SELECT * FROM teams WHERE ");
    let mut clauses = Vec::new();
    for (i, _) in key_parts.iter().enumerate() {
        clauses.push(format!("canonical_name ILIKE ${}", i + 1));
    }
    query.push_str(&clauses.join(" AND "));

    let mut bind_idx = key_parts.len() + 1;
    if birth_year.is_some() {
        query.push_str(&format!(" AND birth_year = ${}", bind_idx));
        bind_idx += 1;
    }
    let _ = bind_idx;
    query.push_str(" LIMIT 5");

    let mut q = sqlx::query(&query);
    for part in key_parts {
        q = q.bind(format!("%{}%", part));
    }
    if let Some(year) = birth_year {
        q = q.bind(year);
    }

    let rows = q.fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_team).collect())
}

pub async fn insert_team_new(
    pool: &PgPool,
    display_name: &str,
    canonical_name: &str,
    birth_year: Option<i32>,
    gender: Gender,
    age_group: Option<&str>,
    state: &str,
    starting_elo: f64,
    birth_year_source: Option<&str>,
    gender_source: Option<&str>,
) -> Result<Team> {
    let team = Team {
        id: Uuid::new_v4(),
        display_name: display_name.to_string(),
        canonical_name: canonical_name.to_string(),
        birth_year,
        gender,
        age_group: age_group.map(str::to_string),
        state: state.to_string(),
        club_id: None,
        elo_rating: starting_elo,
        wins: 0,
        losses: 0,
        draws: 0,
        matches_played: 0,
        last_match_date: None,
        data_quality_score: data_quality_score(birth_year.is_some(), !matches!(gender, Gender::Unknown)),
        birth_year_source: birth_year_source.map(str::to_string),
        gender_source: gender_source.map(str::to_string),
        updated_at: Utc::now(),
    };
    insert_team(pool, &team).await?;
    Ok(team)
}

fn data_quality_score(has_birth_year: bool, has_gender: bool) -> f64 {
    let mut score = 0.5;
    if has_birth_year {
        score += 0.3;
    }
    if has_gender {
        score += 0.2;
    }
    score
}

pub async fn get_all_teams(pool: &PgPool) -> Result<Vec<Team>> {
    let rows = sqlx::query("SELECT * FROM teams ORDER BY canonical_name")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(row_to_team).collect())
}

/// Teams with at least one match, grouped for rank computation.
pub async fn teams_with_matches_in_group(
    pool: &PgPool,
    birth_year: Option<i32>,
    gender: Gender,
    state: Option<&str>,
) -> Result<Vec<Team>> {
    let rows = match (birth_year, state) {
        (Some(year), Some(st)) => {
            sqlx::query(
                "SELECT * FROM teams WHERE birth_year = $1 AND gender = $2 AND state = $3 AND matches_played >= 1 ORDER BY elo_rating DESC",
            )
            .bind(year)
            .bind(gender_str(gender))
            .bind(st)
            .fetch_all(pool)
            .await?
        }
        (Some(year), None) => {
            sqlx::query(
                "SELECT * FROM teams WHERE birth_year = $1 AND gender = $2 AND matches_played >= 1 ORDER BY elo_rating DESC",
            )
            .bind(year)
            .bind(gender_str(gender))
            .fetch_all(pool)
            .await?
        }
        (None, Some(st)) => {
            sqlx::query(
                "SELECT * FROM teams WHERE birth_year IS NULL AND gender = $1 AND state = $2 AND matches_played >= 1 ORDER BY elo_rating DESC",
            )
            .bind(gender_str(gender))
            .bind(st)
            .fetch_all(pool)
            .await?
        }
        (None, None) => {
            sqlx::query(
                "SELECT * FROM teams WHERE birth_year IS NULL AND gender = $1 AND matches_played >= 1 ORDER BY elo_rating DESC",
            )
            .bind(gender_str(gender))
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows.iter().map(row_to_team).collect())
}

/// Distinct (birth_year, gender) groups among teams with at least one match.
pub async fn distinct_birth_year_gender_groups(pool: &PgPool) -> Result<Vec<(Option<i32>, Gender)>> {
    let rows = sqlx::query(
        "SELECT DISTINCT birth_year, gender FROM teams WHERE matches_played >= 1",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .iter()
        .map(|r| (r.get("birth_year"), gender_from_str(r.get::<String, _>("gender").as_str())))
        .collect())
}

/// Distinct (state, birth_year, gender) groups among teams with at least one match.
pub async fn distinct_state_birth_year_gender_groups(
    pool: &PgPool,
) -> Result<Vec<(String, Option<i32>, Gender)>> {
    let rows = sqlx::query(
        "SELECT DISTINCT state, birth_year, gender FROM teams WHERE matches_played >= 1",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .iter()
        .map(|r| {
            (
                r.get("state"),
                r.get("birth_year"),
                gender_from_str(r.get::<String, _>("gender").as_str()),
            )
        })
        .collect())
}

pub async fn update_team_rating_and_tallies(
    pool: &PgPool,
    team_id: Uuid,
    elo_rating: f64,
    wins: i32,
    losses: i32,
    draws: i32,
    last_match_date: chrono::NaiveDate,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE teams SET
            elo_rating = $2,
            wins = $3,
            losses = $4,
            draws = $5,
            matches_played = $3 + $4 + $5,
            last_match_date = $6,
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(team_id)
    .bind(elo_rating)
    .bind(wins)
    .bind(losses)
    .bind(draws)
    .bind(last_match_date)
    .execute(pool)
    .await?;
    Ok(())
}

/// Corrects a team's `birth_year` in place, used by birth-year repair once
/// a row has been freed of conflicting matches (or had none to begin with).
pub async fn update_team_birth_year(pool: &PgPool, team_id: Uuid, birth_year: i32) -> Result<()> {
    sqlx::query("UPDATE teams SET birth_year = $2, birth_year_source = 'parsed_4digit', updated_at = now() WHERE id = $1")
        .bind(team_id)
        .bind(birth_year)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn reset_elo_ratings(pool: &PgPool, starting_elo: f64) -> Result<()> {
    sqlx::query(
        "UPDATE teams SET elo_rating = $1, wins = 0, losses = 0, draws = 0, matches_played = 0",
    )
    .bind(starting_elo)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_round_trips_through_its_string_form() {
        for g in [Gender::Male, Gender::Female, Gender::Unknown] {
            assert_eq!(gender_from_str(gender_str(g)), g);
        }
    }

    #[test]
    fn data_quality_rewards_more_confident_parses() {
        assert!(data_quality_score(true, true) > data_quality_score(true, false));
        assert!(data_quality_score(true, false) > data_quality_score(false, false));
    }
}
