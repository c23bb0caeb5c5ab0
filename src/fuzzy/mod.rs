use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::models::AliasSource;
use crate::resolver::name_parser::{extract_any_4digit_year, extract_gender_indicator};

const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.70;
const AMBIGUITY_GAP: f64 = 0.05;

const COLOR_TOKENS: &[&str] = &[
    "red", "blue", "black", "white", "gold", "silver", "green", "orange", "navy", "royal",
    "gray", "grey", "purple", "yellow", "maroon", "teal", "pink",
];

#[derive(Debug, Clone)]
pub enum FuzzyMode {
    Standard,
    Aggressive { threshold: f32, top_n: usize, state: Option<String> },
}

#[derive(Debug)]
pub enum MatchDecision {
    Linked(Uuid),
    Ambiguous { candidate_1: (Uuid, f64), candidate_2: (Uuid, f64) },
    NoCandidate,
}

pub struct FuzzyMatcher<'a> {
    pool: &'a PgPool,
}

impl<'a> FuzzyMatcher<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Phase 1 — exact equality on the lowercased, trimmed raw name.
    pub async fn phase1_exact(&self, raw_name: &str) -> Result<Option<Uuid>> {
        let normalized = raw_name.trim().to_lowercase();
        Ok(db::find_alias_exact(self.pool, &normalized)
            .await?
            .map(|a| a.team_id))
    }

    /// Phase 2 — equality join after punctuation-strip, color-removal, and
    /// trailing-parenthetical-strip transforms, tried in that order.
    pub async fn phase2_normalized(&self, raw_name: &str) -> Result<Option<Uuid>> {
        for normalized in [
            strip_punctuation(raw_name),
            remove_color_tokens(&strip_punctuation(raw_name)),
            strip_trailing_parenthetical(raw_name),
        ] {
            if let Some(alias) = db::find_alias_exact(self.pool, &normalized).await? {
                return Ok(Some(alias.team_id));
            }
        }
        Ok(None)
    }

    /// Phase 3 — trigram fuzzy lookup with year/gender guards and an
    /// ambiguity gap test. Links and emits a self-healing `fuzzy_learned`
    /// alias on success.
    pub async fn phase3_fuzzy(&self, raw_name: &str, mode: FuzzyMode) -> Result<MatchDecision> {
        let normalized = normalize_for_fuzzy(raw_name);
        let (threshold, top_n, state) = match mode {
            FuzzyMode::Standard => (DEFAULT_SIMILARITY_THRESHOLD, 10usize, None),
            FuzzyMode::Aggressive { threshold, top_n, state } => (threshold, top_n, state),
        };

        let mut candidates = match &state {
            Some(state) => {
                db::find_aliases_by_trigram_in_state(self.pool, &normalized, threshold, state, top_n as i64).await?
            }
            None => db::find_aliases_by_trigram(self.pool, &normalized, threshold, top_n as i64).await?,
        };

        let input_year = extract_any_4digit_year(&normalized);
        let input_gender = extract_gender_indicator(raw_name);

        candidates.retain(|(alias, _sim)| {
            let candidate_year = extract_any_4digit_year(&alias.alias_name);
            if let (Some(iy), Some(cy)) = (input_year, candidate_year) {
                if iy != cy {
                    return false;
                }
            }
            let candidate_gender = extract_gender_indicator(&alias.alias_name);
            if !matches!(input_gender, crate::models::Gender::Unknown)
                && !matches!(candidate_gender, crate::models::Gender::Unknown)
                && input_gender != candidate_gender
            {
                return false;
            }
            true
        });

        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let Some((top_alias, top_sim)) = candidates.first() else {
            return Ok(MatchDecision::NoCandidate);
        };

        if let Some((second_alias, second_sim)) = candidates.get(1) {
            if top_sim - second_sim < AMBIGUITY_GAP {
                return Ok(MatchDecision::Ambiguous {
                    candidate_1: (top_alias.team_id, *top_sim),
                    candidate_2: (second_alias.team_id, *second_sim),
                });
            }
        }

        let team_id = top_alias.team_id;
        db::insert_alias(self.pool, team_id, &normalized, AliasSource::FuzzyLearned).await?;
        Ok(MatchDecision::Linked(team_id))
    }
}

fn strip_punctuation(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| !matches!(c, '.' | '\'' | '"' | '-'))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn remove_color_tokens(normalized: &str) -> String {
    normalized
        .split_whitespace()
        .filter(|token| !COLOR_TOKENS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_trailing_parenthetical(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    if let Some(open) = lower.rfind('(') {
        if lower.trim_end().ends_with(')') {
            return lower[..open].trim_end().to_string();
        }
    }
    lower
}

fn normalize_for_fuzzy(name: &str) -> String {
    remove_color_tokens(&strip_punctuation(&strip_trailing_parenthetical(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_collapses_whitespace() {
        assert_eq!(strip_punctuation("Sporting B.V. - Pre-NAL \"15\""), "sporting bv prenal 15");
    }

    #[test]
    fn removes_color_tokens() {
        assert_eq!(remove_color_tokens("rush royal 2014"), "rush 2014");
    }

    #[test]
    fn strips_trailing_parenthetical_suffix() {
        assert_eq!(strip_trailing_parenthetical("Sporting KC (Academy)"), "sporting kc");
    }

    #[test]
    fn extracts_a_bounded_4digit_year() {
        assert_eq!(extract_any_4digit_year("rush 2014 elite"), Some(2014));
        assert_eq!(extract_any_4digit_year("no year here"), None);
    }
}
