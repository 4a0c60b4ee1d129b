//! Persisted entities.
//!
//! Row types derive `sqlx::FromRow` so the Postgres store can map them
//! directly; the `*Fields` types are the write-side payloads.

pub mod game_status;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use game_status::{GameStatus, STATUS_SCHEDULED};

/// Name of the singleton "opponent not yet determined" team.
pub const PLACEHOLDER_TEAM_NAME: &str = "TBD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: i64,
    pub external_id: Option<String>,
    pub name: String,
    pub abbreviation: Option<String>,
    pub logo_url: Option<String>,
    pub is_placeholder: bool,
}

/// Mutable team attributes as reported by the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamFields {
    pub external_id: Option<String>,
    pub name: String,
    pub abbreviation: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Player {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub team_id: Option<i64>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerFields {
    pub external_id: String,
    pub name: String,
    pub team_id: Option<i64>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Game {
    pub id: i64,
    pub external_id: String,
    /// Civil date in the league's home time zone
    pub game_date: NaiveDate,
    /// None while the matchup is TBD
    pub start_time: Option<DateTime<Utc>>,
    /// Provider status name, e.g. `STATUS_FINAL`
    pub status: String,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub stats_processed: bool,
}

impl Game {
    pub fn lifecycle(&self) -> GameStatus {
        GameStatus::from_provider(&self.status)
    }

    pub fn involves_team(&self, team_id: i64) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameFields {
    pub external_id: String,
    pub game_date: NaiveDate,
    pub start_time: Option<DateTime<Utc>>,
    pub status: String,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

/// One player's line for one game. `None` means "not reported yet", never zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayerGameStats {
    pub game_id: i64,
    pub player_id: i64,
    pub points: Option<i32>,
    pub rebounds: Option<i32>,
    pub assists: Option<i32>,
    pub steals: Option<i32>,
    pub blocks: Option<i32>,
    pub turnovers: Option<i32>,
    pub minutes: Option<String>,
}

/// Membership of a user in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupUser {
    pub id: i64,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// A pick. Score is derived on read, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Submission {
    pub id: i64,
    pub group_user_id: i64,
    pub game_id: i64,
    pub player_id: i64,
    /// The game's civil date, backing the one-pick-per-day constraint. Kept in
    /// step with the game by `Store::upsert_game`.
    pub game_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub group_user_id: i64,
    pub game_id: i64,
    pub player_id: i64,
    pub game_date: NaiveDate,
}
