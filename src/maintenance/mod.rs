use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::models::{EventType, Match, Team};
use crate::resolver::name_parser::extract_any_4digit_year;
use crate::resolver::season::season_year;

pub struct OpReport {
    pub op: &'static str,
    pub affected: u64,
    pub dry_run: bool,
}

/// Catches teams whose `display_name` embeds a 4-digit year that disagrees
/// with the stored `birth_year` -- the canonical signature of a team that
/// was split into two rows under the same identity (e.g. "Rush 2014 Elite"
/// stored with `birth_year = 2013`). When a duplicate row already holds the
/// correct year, the two are merged; otherwise the stored row is corrected
/// in place.
pub async fn birth_year_repair(pool: &PgPool, dry_run: bool) -> Result<OpReport> {
    let teams = db::get_all_teams(pool).await?;
    let mut affected = 0u64;

    for team in teams {
        let Some(embedded_year) = extract_any_4digit_year(&team.display_name) else {
            continue;
        };
        if team.birth_year == Some(embedded_year) {
            continue;
        }

        affected += 1;
        if dry_run {
            continue;
        }

        let duplicate = db::find_team_level1(pool, &team.canonical_name, Some(embedded_year))
            .await?
            .into_iter()
            .find(|t| t.id != team.id);

        match duplicate {
            Some(duplicate) => merge_teams(pool, &team, &duplicate, embedded_year).await?,
            None => db::update_team_birth_year(pool, team.id, embedded_year).await?,
        }
    }

    Ok(OpReport { op: "birth-year-repair", affected, dry_run })
}

/// Merges two rows that share a canonical identity, keeping the one with
/// more recorded matches as the surviving row and re-pointing the other's
/// matches onto it before correcting `birth_year`.
async fn merge_teams(pool: &PgPool, a: &Team, b: &Team, correct_year: i32) -> Result<()> {
    let (winner, loser) = if a.matches_played >= b.matches_played { (a, b) } else { (b, a) };
    resolve_conflicts_and_repoint(pool, loser.id, winner.id).await?;
    db::update_team_birth_year(pool, winner.id, correct_year).await?;
    Ok(())
}

/// Before re-pointing `loser_id`'s matches onto `winner_id`, soft-deletes
/// any match that would become a duplicate or a self-match: a direct
/// loser-vs-winner fixture, or a loser match sharing `(date, opponent)`
/// with one the winner already has.
async fn resolve_conflicts_and_repoint(pool: &PgPool, loser_id: Uuid, winner_id: Uuid) -> Result<()> {
    let live = db::live_matches_for_teams(pool, loser_id, winner_id).await?;
    let (loser_matches, winner_matches): (Vec<&Match>, Vec<&Match>) = live
        .iter()
        .partition(|m| m.home_team_id == loser_id || m.away_team_id == loser_id);

    for m in loser_matches {
        let opponent = if m.home_team_id == loser_id { m.away_team_id } else { m.home_team_id };

        if opponent == winner_id {
            db::soft_delete_match(pool, m.id, "merged: direct fixture against surviving team").await?;
            continue;
        }

        let duplicates_existing = winner_matches.iter().any(|w| {
            w.match_date == m.match_date
                && (w.home_team_id == opponent || w.away_team_id == opponent)
        });
        if duplicates_existing {
            db::soft_delete_match(pool, m.id, "merged: duplicate of surviving team's fixture").await?;
        }
    }

    sqlx::query("UPDATE matches SET home_team_id = $2 WHERE home_team_id = $1 AND deleted_at IS NULL")
        .bind(loser_id)
        .bind(winner_id)
        .execute(pool)
        .await?;
    sqlx::query("UPDATE matches SET away_team_id = $2 WHERE away_team_id = $1 AND deleted_at IS NULL")
        .bind(loser_id)
        .bind(winner_id)
        .execute(pool)
        .await?;
    sqlx::query("UPDATE teams SET updated_at = now() WHERE id = $1")
        .bind(winner_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Links canonical matches that were upserted before their staged row
/// finished processing, joining back to staging by `source_match_key` and
/// attaching the league or tournament the staged row names.
pub async fn recover_unlinked_matches(pool: &PgPool, dry_run: bool) -> Result<OpReport> {
    let unlinked = db::matches_with_null_event_and_source_key(pool, 1000).await?;
    let mut affected = 0u64;

    for m in unlinked {
        let Some(staged) = db::get_staged_by_key(pool, &m.source_match_key).await? else {
            continue;
        };

        let season = db::get_season_by_year(pool, season_year(m.match_date)).await?;
        let Some(season) = season else { continue };

        affected += 1;
        if !dry_run {
            let event = crate::resolver::find_or_create_event(
                pool,
                staged.event_id.as_deref(),
                staged.event_name.as_deref().unwrap_or("Unknown Event"),
                None,
                &staged.source_platform,
                season.id,
            )
            .await?;

            match event.event_type {
                EventType::League => db::attach_league(pool, m.id, event.id).await?,
                EventType::Tournament => db::attach_tournament(pool, m.id, event.id).await?,
            }
        }
    }

    Ok(OpReport { op: "unlinked-matches", affected, dry_run })
}

/// Deletes `fuzzy_learned` aliases whose embedded birth year no longer
/// matches the team they point to.
pub async fn alias_cleanup(pool: &PgPool, dry_run: bool) -> Result<OpReport> {
    let affected = db::delete_mismatched_aliases(pool, dry_run).await?;
    Ok(OpReport { op: "alias-cleanup", affected, dry_run })
}
