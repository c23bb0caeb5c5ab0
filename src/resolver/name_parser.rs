use crate::models::{DataFlag, Gender, NameMetadata};
use crate::resolver::season::{birth_year_from_age_group, valid_birth_year_range};

const STOP_TOKENS: &[&str] = &[
    "fc", "sc", "afc", "ac", "boys", "girls", "club", "soccer", "united", "academy",
];

/// Lowercases and collapses whitespace — the normalization the unique
/// constraint on `canonical_name` assumes is idempotent.
pub fn normalize_canonical_name(raw: &str) -> String {
    raw.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn digit_run_at(chars: &[char], start: usize, len: usize) -> Option<i32> {
    if start + len > chars.len() {
        return None;
    }
    let slice = &chars[start..start + len];
    if slice.iter().all(|c| c.is_ascii_digit()) {
        slice.iter().collect::<String>().parse::<i32>().ok()
    } else {
        None
    }
}

fn is_boundary(chars: &[char], idx: isize) -> bool {
    if idx < 0 || idx as usize >= chars.len() {
        return true;
    }
    !chars[idx as usize].is_ascii_alphanumeric()
}

/// Rule (i): a 4-digit year token, bounded by the valid range for `season_year`.
fn find_4digit_year(name: &str, season_year: i32) -> Option<i32> {
    let chars: Vec<char> = name.chars().collect();
    let (lo, hi) = valid_birth_year_range(season_year);
    for start in 0..chars.len() {
        if let Some(year) = digit_run_at(&chars, start, 4) {
            if is_boundary(&chars, start as isize - 1) && is_boundary(&chars, (start + 4) as isize)
            {
                if year >= lo && year <= hi {
                    return Some(year);
                }
            }
        }
    }
    None
}

/// Rule (ii): a 2-digit year adjacent to a B/G gender code, e.g. `B14`, `14G`.
/// `season_year` bounds the accepted birth year; pass `None` to match the
/// gender code alone without a year-range check.
fn find_2digit_gender_year(name: &str, season_year: Option<i32>) -> Option<(i32, Gender)> {
    let upper: Vec<char> = name.to_uppercase().chars().collect();
    for start in 0..upper.len() {
        let Some(two) = digit_run_two(&upper, start) else { continue };
        let before = if start > 0 { Some(upper[start - 1]) } else { None };
        let after = upper.get(start + 2).copied();

        let gender = match (before, after) {
            (Some('B'), _) if is_boundary(&upper, start as isize - 2) => Some(Gender::Male),
            (_, Some('B')) if is_boundary(&upper, (start + 3) as isize) => Some(Gender::Male),
            (Some('G'), _) if is_boundary(&upper, start as isize - 2) => Some(Gender::Female),
            (_, Some('G')) if is_boundary(&upper, (start + 3) as isize) => Some(Gender::Female),
            _ => None,
        };

        if let Some(gender) = gender {
            let full_year = 2000 + two;
            match season_year {
                Some(season_year) => {
                    let (lo, hi) = valid_birth_year_range(season_year);
                    if full_year >= lo && full_year <= hi {
                        return Some((full_year, gender));
                    }
                }
                None => return Some((full_year, gender)),
            }
        }
    }
    None
}

fn digit_run_two(chars: &[char], start: usize) -> Option<i32> {
    if start + 2 > chars.len() {
        return None;
    }
    let slice = &chars[start..start + 2];
    if slice.iter().all(|c| c.is_ascii_digit()) {
        slice.iter().collect::<String>().parse::<i32>().ok()
    } else {
        None
    }
}

/// Rule (iii): a `U<n>` age-group token, `n` in `[7, 19]`.
fn find_u_age_group(name: &str) -> Option<i32> {
    let upper: Vec<char> = name.to_uppercase().chars().collect();
    for start in 0..upper.len() {
        if upper[start] != 'U' {
            continue;
        }
        if !is_boundary(&upper, start as isize - 1) {
            continue;
        }
        for len in [2usize, 1usize] {
            if let Some(n) = digit_run_at(&upper, start + 1, len) {
                if is_boundary(&upper, (start + 1 + len) as isize) && (7..=19).contains(&n) {
                    return Some(n);
                }
            }
        }
    }
    None
}

/// Extracts any bounded 4-digit run from text, with no season-year range
/// check — used by maintenance ops that compare a name's literal year
/// against the stored `birth_year`, which is a standing invariant rather
/// than something scoped to the season a row was ingested in.
pub fn extract_any_4digit_year(text: &str) -> Option<i32> {
    let chars: Vec<char> = text.chars().collect();
    for start in 0..chars.len() {
        if let Some(year) = digit_run_at(&chars, start, 4) {
            if is_boundary(&chars, start as isize - 1) && is_boundary(&chars, (start + 4) as isize) {
                return Some(year);
            }
        }
    }
    None
}

/// Gender indicator independent of a birth-year token: `boys|girls|B<nn>|G<nn>`.
pub fn extract_gender_indicator(name: &str) -> Gender {
    let lower = name.to_lowercase();
    if lower.contains("boys") {
        return Gender::Male;
    }
    if lower.contains("girls") {
        return Gender::Female;
    }
    if let Some((_, gender)) = find_2digit_gender_year(name, None) {
        return gender;
    }
    Gender::Unknown
}

fn age_group_label(birth_year: Option<i32>, season_year: i32) -> Option<String> {
    birth_year.map(|year| format!("U{}", season_year - year))
}

/// Applies the four priority rules in order and returns the parsed metadata.
pub fn parse_team_name(raw_name: &str, season_year: i32) -> NameMetadata {
    let canonical_name = normalize_canonical_name(raw_name);
    let gender = extract_gender_indicator(raw_name);

    if let Some(year) = find_4digit_year(raw_name, season_year) {
        return NameMetadata {
            canonical_name,
            birth_year: Some(year),
            gender,
            age_group: age_group_label(Some(year), season_year),
            birth_year_flag: DataFlag::Parsed4Digit,
        };
    }

    if let Some((year, inferred_gender)) = find_2digit_gender_year(raw_name, Some(season_year)) {
        let gender = if matches!(gender, Gender::Unknown) { inferred_gender } else { gender };
        return NameMetadata {
            canonical_name,
            birth_year: Some(year),
            gender,
            age_group: age_group_label(Some(year), season_year),
            birth_year_flag: DataFlag::Parsed2Digit,
        };
    }

    if let Some(n) = find_u_age_group(raw_name) {
        let birth_year = birth_year_from_age_group(season_year, n);
        return NameMetadata {
            canonical_name,
            birth_year,
            gender,
            age_group: Some(format!("U{}", n)),
            birth_year_flag: DataFlag::ParsedAgeGroup,
        };
    }

    NameMetadata {
        canonical_name,
        birth_year: None,
        gender,
        age_group: None,
        birth_year_flag: DataFlag::Unknown,
    }
}

/// Tokens of length >= 2, excluding stop-tokens, used by the Level 2
/// key-part lookup.
pub fn key_parts(canonical_name: &str) -> Vec<String> {
    canonical_name
        .split_whitespace()
        .filter(|t| t.len() >= 2 && !STOP_TOKENS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Level 2 candidate score: shared-token ratio blended with `strsim`
/// Jaro-Winkler similarity on the full name (catches misspellings the
/// token-overlap count misses) + 0.2 if birth_year token matches + 0.2 *
/// matching-numeric-token ratio.
pub fn level2_score(
    input_parts: &[String],
    candidate_canonical_name: &str,
    input_birth_year: Option<i32>,
    candidate_birth_year: Option<i32>,
) -> f64 {
    let candidate_parts: Vec<String> = candidate_canonical_name
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let shared = input_parts
        .iter()
        .filter(|p| candidate_parts.contains(p))
        .count();
    let denom = input_parts.len().max(candidate_parts.len()).max(1);
    let token_ratio = shared as f64 / denom as f64;

    let input_joined = input_parts.join(" ");
    let string_sim = strsim::jaro_winkler(&input_joined, candidate_canonical_name);

    let mut score = 0.7 * token_ratio + 0.3 * string_sim;
    if input_birth_year.is_some() && input_birth_year == candidate_birth_year {
        score += 0.2;
    }

    let input_numeric: Vec<&String> = input_parts.iter().filter(|p| p.chars().all(|c| c.is_ascii_digit())).collect();
    let candidate_numeric: Vec<&String> = candidate_parts.iter().filter(|p| p.chars().all(|c| c.is_ascii_digit())).collect();
    if !input_numeric.is_empty() {
        let matching = input_numeric.iter().filter(|n| candidate_numeric.contains(n)).count();
        score += 0.2 * (matching as f64 / input_numeric.len() as f64);
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_bare_4digit_year() {
        let meta = parse_team_name("Sporting KC 2012 Boys", 2026);
        assert_eq!(meta.birth_year, Some(2012));
        assert_eq!(meta.gender, Gender::Male);
        assert_eq!(meta.birth_year_flag, DataFlag::Parsed4Digit);
    }

    #[test]
    fn parses_a_2digit_year_with_gender_code() {
        let meta = parse_team_name("Rush B14 Elite", 2026);
        assert_eq!(meta.birth_year, Some(2014));
        assert_eq!(meta.gender, Gender::Male);
        assert_eq!(meta.birth_year_flag, DataFlag::Parsed2Digit);
    }

    #[test]
    fn parses_a_u_age_group_token() {
        let meta = parse_team_name("Strikers U15 Girls", 2026);
        assert_eq!(meta.birth_year, Some(2011));
        assert_eq!(meta.gender, Gender::Female);
        assert_eq!(meta.birth_year_flag, DataFlag::ParsedAgeGroup);
    }

    #[test]
    fn falls_back_to_unknown() {
        let meta = parse_team_name("Wildcats Select", 2026);
        assert_eq!(meta.birth_year, None);
        assert_eq!(meta.birth_year_flag, DataFlag::Unknown);
    }

    #[test]
    fn key_parts_drop_stop_tokens() {
        let parts = key_parts("sporting blue valley fc");
        assert_eq!(parts, vec!["sporting", "blue", "valley"]);
    }
}
