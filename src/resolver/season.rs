use chrono::{Datelike, NaiveDate};

/// Calendar-shifted "season year" used to derive age groups and to bound
/// plausible birth years. August 1st rolls the season forward: a team
/// playing in August 2026 belongs to the 2027 season.
///
/// This reconciles the duplicated DB-side/pipeline-side rule into one
/// function, used everywhere a season year is needed.
pub fn season_year(date: NaiveDate) -> i32 {
    if date.month() >= 8 {
        date.year() + 1
    } else {
        date.year()
    }
}

/// Valid birth-year range for a 4-digit year token: `[season_year - 19, season_year - 7]`.
pub fn valid_birth_year_range(season_year: i32) -> (i32, i32) {
    (season_year - 19, season_year - 7)
}

/// Back-computes a birth year from a `U<n>` age-group token, `n` in `[7, 19]`.
pub fn birth_year_from_age_group(season_year: i32, n: i32) -> Option<i32> {
    if (7..=19).contains(&n) {
        Some(season_year - n)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_rolls_forward_in_august() {
        assert_eq!(season_year(NaiveDate::from_ymd_opt(2026, 7, 31).unwrap()), 2026);
        assert_eq!(season_year(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()), 2027);
    }

    #[test]
    fn age_group_back_computation_respects_bounds() {
        assert_eq!(birth_year_from_age_group(2026, 15), Some(2011));
        assert_eq!(birth_year_from_age_group(2026, 6), None);
        assert_eq!(birth_year_from_age_group(2026, 20), None);
    }
}
