//! When a pick can still be made or changed.
//!
//! Derived from the stored game on every call; nothing caches it.

use crate::models::Game;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PickWindow {
    Open,
    Locked,
}

impl PickWindow {
    pub fn is_open(&self) -> bool {
        matches!(self, PickWindow::Open)
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, PickWindow::Locked)
    }
}

/// Open while the game is still scheduled and tip-off is ahead or unknown.
/// Once a game leaves that state it never reopens.
pub fn pick_window(game: &Game, now: DateTime<Utc>) -> PickWindow {
    let scheduled = game.lifecycle().is_scheduled();
    let before_start = game.start_time.map_or(true, |start| start > now);
    if scheduled && before_start {
        PickWindow::Open
    } else {
        PickWindow::Locked
    }
}
