use anyhow::Result;
use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{Alias, AliasSource};

fn source_str(s: AliasSource) -> &'static str {
    match s {
        AliasSource::FullStripped => "full_stripped",
        AliasSource::ShortForm => "short_form",
        AliasSource::PunctNorm => "punct_norm",
        AliasSource::ColorRemoved => "color_removed",
        AliasSource::YearNormalized => "year_normalized",
        AliasSource::FuzzyLearned => "fuzzy_learned",
        AliasSource::Manual => "manual",
    }
}

fn row_to_alias(row: &sqlx::postgres::PgRow) -> Alias {
    Alias {
        id: row.get("id"),
        team_id: row.get("team_id"),
        alias_name: row.get("alias_name"),
        source: match row.get::<String, _>("source").as_str() {
            "full_stripped" => AliasSource::FullStripped,
            "short_form" => AliasSource::ShortForm,
            "punct_norm" => AliasSource::PunctNorm,
            "color_removed" => AliasSource::ColorRemoved,
            "year_normalized" => AliasSource::YearNormalized,
            "fuzzy_learned" => AliasSource::FuzzyLearned,
            _ => AliasSource::Manual,
        },
        created_at: row.get("created_at"),
    }
}

/// Phase 1 — exact equality on the lowercased, trimmed alias name.
pub async fn find_alias_exact(pool: &PgPool, normalized_name: &str) -> Result<Option<Alias>> {
    let row = sqlx::query("SELECT * FROM team_name_aliases WHERE alias_name = $1 LIMIT 1")
        .bind(normalized_name)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_alias))
}

/// Phase 3 — up to `limit` candidates by trigram similarity against the
/// normalized input, pushed into Postgres via `pg_trgm`'s `%`/`similarity()`.
pub async fn find_aliases_by_trigram(
    pool: &PgPool,
    normalized_name: &str,
    threshold: f32,
    limit: i64,
) -> Result<Vec<(Alias, f64)>> {
    sqlx::query(&format!("SET pg_trgm.similarity_threshold = {}", threshold))
        .execute(pool)
        .await?;

    let rows = sqlx::query(
        r#"
        SELECT *, similarity(alias_name, $1) AS sim
        FROM team_name_aliases
        WHERE alias_name % $1
        ORDER BY sim DESC
        LIMIT $2
        "#,
    )
    .bind(normalized_name)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| (row_to_alias(r), r.get::<f64, _>("sim")))
        .collect())
}

/// Aggressive-mode variant of [`find_aliases_by_trigram`], restricted to
/// candidates whose team sits in `state` — the "bounded top-N, state filter"
/// pass run on names the standard-threshold phases left unlinked.
pub async fn find_aliases_by_trigram_in_state(
    pool: &PgPool,
    normalized_name: &str,
    threshold: f32,
    state: &str,
    limit: i64,
) -> Result<Vec<(Alias, f64)>> {
    sqlx::query(&format!("SET pg_trgm.similarity_threshold = {}", threshold))
        .execute(pool)
        .await?;

    let rows = sqlx::query(
        r#"
        SELECT a.*, similarity(a.alias_name, $1) AS sim
        FROM team_name_aliases a
        JOIN teams t ON t.id = a.team_id
        WHERE a.alias_name % $1 AND t.state = $2
        ORDER BY sim DESC
        LIMIT $3
        "#,
    )
    .bind(normalized_name)
    .bind(state)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| (row_to_alias(r), r.get::<f64, _>("sim")))
        .collect())
}

/// Self-healing alias write. `ON CONFLICT DO NOTHING` since aliases are
/// additive and never deleted except by explicit cleanup.
pub async fn insert_alias(
    pool: &PgPool,
    team_id: Uuid,
    alias_name: &str,
    source: AliasSource,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO team_name_aliases (id, team_id, alias_name, source, created_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (team_id, alias_name) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(team_id)
    .bind(alias_name)
    .bind(source_str(source))
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Alias cleanup maintenance op: removes aliases whose team's current
/// year/gender no longer matches a year/gender parsed from the alias text
/// itself, when both are known.
pub async fn delete_mismatched_aliases(pool: &PgPool, dry_run: bool) -> Result<u64> {
    if dry_run {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n
            FROM team_name_aliases a
            JOIN teams t ON t.id = a.team_id
            WHERE a.source = 'fuzzy_learned'
              AND t.birth_year IS NOT NULL
              AND a.alias_name ~ '\d{4}'
              AND (regexp_match(a.alias_name, '(\d{4})'))[1]::int <> t.birth_year
            "#,
        )
        .fetch_one(pool)
        .await?;
        return Ok(row.get::<i64, _>("n") as u64);
    }

    let result = sqlx::query(
        r#"
        DELETE FROM team_name_aliases a
        USING teams t
        WHERE t.id = a.team_id
          AND a.source = 'fuzzy_learned'
          AND t.birth_year IS NOT NULL
          AND a.alias_name ~ '\d{4}'
          AND (regexp_match(a.alias_name, '(\d{4})'))[1]::int <> t.birth_year
        "#,
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
