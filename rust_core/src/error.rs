//! Error taxonomy for ingestion and pick submission.

use chrono::NaiveDate;
use thiserror::Error;

use crate::db::StoreError;

pub type Result<T> = std::result::Result<T, Error>;

/// Library-wide error type.
///
/// Pick rule violations (`PickLocked`, `PlayerAlreadyUsed`, `DayAlreadyPicked`)
/// are surfaced to the caller as-is and never retried.
#[derive(Error, Debug)]
pub enum Error {
    // Feed errors
    #[error("Upstream feed unavailable: {0}")]
    UpstreamUnavailable(String),

    // Lookup errors
    #[error("Not found: {0}")]
    NotFound(String),

    // Submission rule violations
    #[error("Pick is locked: game {game_id} has already started")]
    PickLocked { game_id: i64 },

    #[error("Player {player_id} has already been picked in this group")]
    PlayerAlreadyUsed { player_id: i64 },

    #[error("A pick has already been made for {date}")]
    DayAlreadyPicked { date: NaiveDate },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Collaborator errors
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Invite token has expired")]
    InviteExpired,

    #[error("Invite token is invalid")]
    InviteInvalid,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Error::NotFound(what.to_string())
    }

    /// True for business-rule rejections of a pick.
    pub fn is_rule_violation(&self) -> bool {
        matches!(
            self,
            Error::PickLocked { .. }
                | Error::PlayerAlreadyUsed { .. }
                | Error::DayAlreadyPicked { .. }
        )
    }
}
