//! Game lifecycle derived from the provider's status string.
//!
//! The provider string (e.g. `STATUS_IN_PROGRESS`) is what gets persisted; this
//! enum is only ever computed from it.

use serde::{Deserialize, Serialize};

/// Provider status name for a game that has not started.
pub const STATUS_SCHEDULED: &str = "STATUS_SCHEDULED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Not started, start time still ahead or TBD
    Scheduled,
    /// Live, including halftime and period breaks
    InProgress,
    /// Completed
    Final,
    /// Postponed, suspended or cancelled
    Postponed,
    /// Any provider status we do not recognize
    Other,
}

impl GameStatus {
    /// Classify a provider status name.
    pub fn from_provider(status: &str) -> Self {
        let status_lower = status.to_lowercase();

        if status_lower.contains("in_progress")
            || status_lower.contains("halftime")
            || status_lower.contains("end_period")
            || status_lower.contains("end_of_period")
        {
            GameStatus::InProgress
        } else if status_lower.contains("final") {
            GameStatus::Final
        } else if status_lower.contains("postponed")
            || status_lower.contains("suspended")
            || status_lower.contains("cancel")
        {
            GameStatus::Postponed
        } else if status_lower.contains("scheduled") {
            GameStatus::Scheduled
        } else {
            GameStatus::Other
        }
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self, GameStatus::Scheduled)
    }
}
