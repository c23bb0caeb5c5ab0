use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Default for Gender {
    fn default() -> Self {
        Gender::Unknown
    }
}

/// How a parsed field on a [`Team`] was derived. One flag per parseable
/// attribute; recorded so maintenance ops and reviewers can tell a confident
/// parse from a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFlag {
    Parsed4Digit,
    Parsed2Digit,
    ParsedAgeGroup,
    InferredFromSource,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: uuid::Uuid,
    pub display_name: String,
    pub canonical_name: String,
    pub birth_year: Option<i32>,
    pub gender: Gender,
    pub age_group: Option<String>,
    pub state: String,
    pub club_id: Option<uuid::Uuid>,
    pub elo_rating: f64,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub matches_played: i32,
    pub last_match_date: Option<NaiveDate>,
    pub data_quality_score: f64,
    pub birth_year_source: Option<String>,
    pub gender_source: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "lowercase")]
pub enum EventType {
    League,
    Tournament,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: uuid::Uuid,
    pub event_type: EventType,
    pub name: String,
    pub state: String,
    pub season_id: uuid::Uuid,
    pub source_event_id: Option<String>,
    pub source_platform: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Match {
    pub id: uuid::Uuid,
    pub match_date: NaiveDate,
    pub match_time: Option<NaiveTime>,
    pub home_team_id: uuid::Uuid,
    pub away_team_id: uuid::Uuid,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub league_id: Option<uuid::Uuid>,
    pub tournament_id: Option<uuid::Uuid>,
    pub venue_id: Option<uuid::Uuid>,
    pub source_platform: String,
    pub source_match_key: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    pub fn is_completed(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "snake_case")]
pub enum AliasSource {
    FullStripped,
    ShortForm,
    PunctNorm,
    ColorRemoved,
    YearNormalized,
    FuzzyLearned,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Alias {
    pub id: uuid::Uuid,
    pub team_id: uuid::Uuid,
    pub alias_name: String,
    pub source: AliasSource,
    pub created_at: DateTime<Utc>,
}

/// Status of a normalized match record as emitted by an adapter, per the
/// adapter contract's `status ∈ {scheduled, in_progress, completed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    InProgress,
    Completed,
}

impl MatchStatus {
    /// Falls back to score presence when an adapter has no richer status
    /// signal of its own (e.g. no live in-progress feed).
    pub fn from_scores(home_score: Option<i32>, away_score: Option<i32>) -> Self {
        if home_score.is_some() && away_score.is_some() {
            MatchStatus::Completed
        } else {
            MatchStatus::Scheduled
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StagedMatch {
    pub source_match_key: String,
    pub match_date: NaiveDate,
    pub match_time: Option<NaiveTime>,
    pub home_team_name: String,
    pub away_team_name: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub status: MatchStatus,
    pub location: Option<String>,
    pub division: Option<String>,
    pub gender: Option<Gender>,
    pub age_group: Option<String>,
    pub event_name: Option<String>,
    pub event_id: Option<String>,
    pub source_platform: String,
    pub raw_data: serde_json::Value,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "lowercase")]
pub enum AmbiguityField {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "lowercase")]
pub enum AmbiguityStatus {
    Pending,
    Resolved,
    Dismissed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AmbiguityQueueEntry {
    pub id: uuid::Uuid,
    pub match_source_key: String,
    pub field_type: AmbiguityField,
    pub raw_name: String,
    pub candidate_1_team: uuid::Uuid,
    pub candidate_1_sim: f64,
    pub candidate_2_team: uuid::Uuid,
    pub candidate_2_sim: f64,
    pub status: AmbiguityStatus,
    pub resolved_team: Option<uuid::Uuid>,
    pub resolved_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RankHistorySnapshot {
    pub team_id: uuid::Uuid,
    pub snapshot_date: NaiveDate,
    pub elo_rating: f64,
    pub elo_national_rank: Option<i32>,
    pub elo_state_rank: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Season {
    pub id: uuid::Uuid,
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
}

/// Parsed metadata extracted from a raw team name, per the resolver's
/// name-parsing priority rules.
#[derive(Debug, Clone)]
pub struct NameMetadata {
    pub canonical_name: String,
    pub birth_year: Option<i32>,
    pub gender: Gender,
    pub age_group: Option<String>,
    pub birth_year_flag: DataFlag,
}
