use anyhow::Result;
use sqlx::PgPool;

use crate::db;
use crate::models::{Match, Team};

pub const K_FACTOR: f64 = 32.0;
pub const STARTING_ELO: f64 = 1500.0;

/// Expected score of the home side against the away side, per the
/// logistic Elo curve.
pub fn expected_score(rating_home: f64, rating_away: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((rating_away - rating_home) / 400.0))
}

/// New rating after one match, rounded to the nearest integer the way the
/// chronological replay persists it.
pub fn updated_rating(rating: f64, expected: f64, actual_score: f64) -> f64 {
    (rating + K_FACTOR * (actual_score - expected)).round()
}

fn actual_scores(home_score: i32, away_score: i32) -> (f64, f64) {
    match home_score.cmp(&away_score) {
        std::cmp::Ordering::Greater => (1.0, 0.0),
        std::cmp::Ordering::Less => (0.0, 1.0),
        std::cmp::Ordering::Equal => (0.5, 0.5),
    }
}

pub struct ReplayOutcome {
    pub matches_replayed: usize,
}

/// Replays every completed match in the season in strict chronological
/// order, updating both teams' ratings and a per-day rank_history snapshot
/// after each one. Requires the full season's history since a rating
/// carries forward from every earlier match, not just the ones since the
/// last run.
pub async fn replay_season(
    pool: &PgPool,
    season_start: chrono::NaiveDate,
    season_end: chrono::NaiveDate,
) -> Result<ReplayOutcome> {
    db::reset_elo_ratings(pool, STARTING_ELO).await?;

    let matches = db::completed_matches_chronological(pool, season_start, season_end).await?;
    let mut ratings: std::collections::HashMap<uuid::Uuid, (f64, i32, i32, i32)> =
        std::collections::HashMap::new();

    for m in &matches {
        apply_match(pool, m, &mut ratings).await?;
    }

    Ok(ReplayOutcome { matches_replayed: matches.len() })
}

async fn apply_match(
    pool: &PgPool,
    m: &Match,
    ratings: &mut std::collections::HashMap<uuid::Uuid, (f64, i32, i32, i32)>,
) -> Result<()> {
    let (Some(home_score), Some(away_score)) = (m.home_score, m.away_score) else {
        return Ok(());
    };

    let home = *ratings
        .entry(m.home_team_id)
        .or_insert_with(|| (STARTING_ELO, 0, 0, 0));
    let away = *ratings
        .entry(m.away_team_id)
        .or_insert_with(|| (STARTING_ELO, 0, 0, 0));

    let expected_home = expected_score(home.0, away.0);
    let expected_away = 1.0 - expected_home;
    let (actual_home, actual_away) = actual_scores(home_score, away_score);

    let new_home_rating = updated_rating(home.0, expected_home, actual_home);
    let new_away_rating = updated_rating(away.0, expected_away, actual_away);

    let (home_w, home_l, home_d) = tally_delta(actual_home);
    let (away_w, away_l, away_d) = tally_delta(actual_away);

    let new_home = (new_home_rating, home.1 + home_w, home.2 + home_l, home.3 + home_d);
    let new_away = (new_away_rating, away.1 + away_w, away.2 + away_l, away.3 + away_d);

    db::update_team_rating_and_tallies(
        pool,
        m.home_team_id,
        new_home.0,
        new_home.1,
        new_home.2,
        new_home.3,
        m.match_date,
    )
    .await?;
    db::update_team_rating_and_tallies(
        pool,
        m.away_team_id,
        new_away.0,
        new_away.1,
        new_away.2,
        new_away.3,
        m.match_date,
    )
    .await?;

    db::upsert_rank_history(pool, m.home_team_id, m.match_date, new_home.0).await?;
    db::upsert_rank_history(pool, m.away_team_id, m.match_date, new_away.0).await?;

    ratings.insert(m.home_team_id, new_home);
    ratings.insert(m.away_team_id, new_away);

    Ok(())
}

fn tally_delta(actual_score: f64) -> (i32, i32, i32) {
    if actual_score == 1.0 {
        (1, 0, 0)
    } else if actual_score == 0.0 {
        (0, 1, 0)
    } else {
        (0, 0, 1)
    }
}

/// Computes national and state ranks for every group with at least one
/// match, breaking ties deterministically by team id so the ordering is
/// stable across runs.
pub async fn recompute_ranks(pool: &PgPool) -> Result<usize> {
    let mut updated = 0usize;

    for (birth_year, gender) in db::distinct_birth_year_gender_groups(pool).await? {
        let teams = db::teams_with_matches_in_group(pool, birth_year, gender, None).await?;
        for (team_id, rank) in ranked(&teams) {
            db::update_national_rank(pool, team_id, rank).await?;
            updated += 1;
        }
    }

    for (state, birth_year, gender) in db::distinct_state_birth_year_gender_groups(pool).await? {
        let teams = db::teams_with_matches_in_group(pool, birth_year, gender, Some(&state)).await?;
        for (team_id, rank) in ranked(&teams) {
            db::update_state_rank(pool, team_id, rank).await?;
            updated += 1;
        }
    }

    Ok(updated)
}

/// Dense competition ranking: rank = 1 + count of strictly-higher ratings,
/// ties broken by ascending team id for a total order.
fn ranked(teams: &[Team]) -> Vec<(uuid::Uuid, i32)> {
    let mut sorted: Vec<&Team> = teams.iter().collect();
    sorted.sort_by(|a, b| {
        b.elo_rating
            .partial_cmp(&a.elo_rating)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    sorted
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let higher = sorted[..i].iter().filter(|other| other.elo_rating > t.elo_rating).count();
            (t.id, higher as i32 + 1)
        })
        .collect()
}

/// Backfills rank_history ranks for every historical snapshot date, for use
/// after a full replay when rank_history rows may predate rank columns.
pub async fn backfill_rank_history(pool: &PgPool) -> Result<usize> {
    let mut updated = 0usize;
    for date in db::distinct_snapshot_dates(pool).await? {
        for (birth_year, gender) in db::distinct_birth_year_gender_groups(pool).await? {
            let teams = db::teams_with_matches_in_group(pool, birth_year, gender, None).await?;
            let ranks = ranked(&teams);
            db::bulk_update_snapshot_national_ranks(pool, date, &ranks).await?;
            updated += ranks.len();
        }
        for (state, birth_year, gender) in db::distinct_state_birth_year_gender_groups(pool).await? {
            let teams = db::teams_with_matches_in_group(pool, birth_year, gender, Some(&state)).await?;
            let ranks = ranked(&teams);
            db::bulk_update_snapshot_state_ranks(pool, date, &ranks).await?;
            updated += ranks.len();
        }
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_score_is_symmetric() {
        let e_home = expected_score(1500.0, 1500.0);
        assert!((e_home - 0.5).abs() < 0.0001);
    }

    /// Three chronological matches -- A beats B, B beats C, A draws C --
    /// starting from 1500 with K=32 converge to A=1514, B=1501, C=1485.
    #[test]
    fn three_match_scenario_matches_expected_ratings() {
        let mut a = STARTING_ELO;
        let mut b = STARTING_ELO;
        let mut c = STARTING_ELO;

        let e_ab = expected_score(a, b);
        a = updated_rating(a, e_ab, 1.0);
        b = updated_rating(b, 1.0 - e_ab, 0.0);

        let e_bc = expected_score(b, c);
        b = updated_rating(b, e_bc, 1.0);
        c = updated_rating(c, 1.0 - e_bc, 0.0);

        let e_ac = expected_score(a, c);
        a = updated_rating(a, e_ac, 0.5);
        c = updated_rating(c, 1.0 - e_ac, 0.5);

        assert_eq!(a as i64, 1514);
        assert_eq!(b as i64, 1501);
        assert_eq!(c as i64, 1485);
    }
}
