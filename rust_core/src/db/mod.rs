//! Persistence for teams, players, games, stat lines, memberships and picks.
//!
//! This module provides:
//! - The `Store` trait, the single seam between the pipeline and storage
//! - `PgStore`, the PostgreSQL implementation (sqlx)
//! - `MemoryStore`, an in-process implementation with identical constraints
//! - Pool creation, health checks and transient-error retry
//!
//! Every uniqueness rule the pipeline depends on is a storage constraint, so a
//! racing writer fails with `StoreError::Conflict` rather than slipping past an
//! application-level check.

pub mod health;
pub mod memory;
pub mod pool;
pub mod postgres;
pub mod retry;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::migrate::Migrator;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Game, GameFields, GroupUser, NewSubmission, Player, PlayerFields, PlayerGameStats,
    Submission, Team, TeamFields,
};

pub use memory::MemoryStore;
pub use pool::{create_pool, create_pool_with_retry, DbPoolConfig};
pub use postgres::PgStore;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Names of the uniqueness constraints, shared by both store implementations.
pub mod constraints {
    pub const TEAMS_EXTERNAL_ID: &str = "teams_external_id_key";
    pub const TEAMS_NAME: &str = "teams_name_key";
    pub const TEAMS_SINGLE_PLACEHOLDER: &str = "teams_single_placeholder";
    pub const PLAYERS_EXTERNAL_ID: &str = "players_external_id_key";
    pub const GAMES_EXTERNAL_ID: &str = "games_external_id_key";
    pub const GROUP_USERS_USER_GROUP: &str = "group_users_user_group_key";
    pub const SUBMISSIONS_GROUP_USER_DAY: &str = "submissions_group_user_day_key";
    pub const SUBMISSIONS_GROUP_USER_PLAYER: &str = "submissions_group_user_player_key";
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// A write lost a uniqueness race
    #[error("Unique constraint {constraint} violated")]
    Conflict { constraint: String },

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    pub fn conflict(constraint: &str) -> Self {
        StoreError::Conflict {
            constraint: constraint.to_string(),
        }
    }

    pub fn is_conflict_on(&self, name: &str) -> bool {
        matches!(self, StoreError::Conflict { constraint } if constraint == name)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return StoreError::Conflict {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                };
            }
        }
        StoreError::Database(e)
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    // Teams
    async fn team(&self, id: i64) -> StoreResult<Option<Team>>;
    async fn team_by_external_id(&self, external_id: &str) -> StoreResult<Option<Team>>;
    async fn team_by_name(&self, name: &str) -> StoreResult<Option<Team>>;
    async fn placeholder_team(&self) -> StoreResult<Option<Team>>;
    async fn insert_team(&self, team: &TeamFields, is_placeholder: bool) -> StoreResult<Team>;
    /// Overwrites name/abbreviation/logo; fills `external_id` only if unset.
    async fn update_team(&self, id: i64, team: &TeamFields) -> StoreResult<Team>;

    // Players
    async fn player(&self, id: i64) -> StoreResult<Option<Player>>;
    async fn player_by_external_id(&self, external_id: &str) -> StoreResult<Option<Player>>;
    async fn upsert_player(&self, player: &PlayerFields) -> StoreResult<Player>;

    // Games
    async fn game(&self, id: i64) -> StoreResult<Option<Game>>;
    async fn game_by_external_id(&self, external_id: &str) -> StoreResult<Option<Game>>;
    /// Also moves the game's picks when its civil date changes, dropping any
    /// that would give a member two picks on one day.
    async fn upsert_game(&self, game: &GameFields) -> StoreResult<Game>;
    async fn games_on(&self, date: NaiveDate) -> StoreResult<Vec<Game>>;
    async fn mark_stats_processed(&self, game_id: i64) -> StoreResult<()>;
    /// Civil dates that currently have at least one in-progress game.
    async fn live_game_dates(&self) -> StoreResult<Vec<NaiveDate>>;

    // Stat lines
    async fn upsert_player_stats(&self, stats: &PlayerGameStats) -> StoreResult<()>;
    async fn player_stats(
        &self,
        game_id: i64,
        player_id: i64,
    ) -> StoreResult<Option<PlayerGameStats>>;
    async fn stats_for_game(&self, game_id: i64) -> StoreResult<Vec<PlayerGameStats>>;

    // Memberships
    async fn group_user(&self, user_id: Uuid, group_id: Uuid) -> StoreResult<Option<GroupUser>>;
    async fn group_user_by_id(&self, id: i64) -> StoreResult<Option<GroupUser>>;
    async fn insert_group_user(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        is_admin: bool,
    ) -> StoreResult<GroupUser>;
    async fn group_users(&self, group_id: Uuid) -> StoreResult<Vec<GroupUser>>;

    // Submissions
    async fn submission_on_day(
        &self,
        group_user_id: i64,
        date: NaiveDate,
    ) -> StoreResult<Option<Submission>>;
    async fn submission_for_player(
        &self,
        group_user_id: i64,
        player_id: i64,
    ) -> StoreResult<Option<Submission>>;
    async fn insert_submission(&self, submission: &NewSubmission) -> StoreResult<Submission>;
    async fn update_submission(
        &self,
        id: i64,
        submission: &NewSubmission,
    ) -> StoreResult<Submission>;
    async fn group_submissions(&self, group_id: Uuid) -> StoreResult<Vec<Submission>>;
    async fn group_submissions_on(
        &self,
        group_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<Submission>>;
}
