//! Box score stat extraction.
//!
//! ESPN basketball athlete blocks are positional:
//! `MIN, FG, 3PT, FT, OREB, DREB, REB, AST, STL, BLK, TO, PF, +/-, PTS`.

use crate::providers::ProviderAthlete;
use serde::{Deserialize, Serialize};

pub const IDX_MINUTES: usize = 0;
pub const IDX_REBOUNDS: usize = 6;
pub const IDX_ASSISTS: usize = 7;
pub const IDX_STEALS: usize = 8;
pub const IDX_BLOCKS: usize = 9;
pub const IDX_TURNOVERS: usize = 10;
pub const IDX_POINTS: usize = 13;

/// Parsed stat line. `None` means the provider did not report the category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatLine {
    pub points: Option<i32>,
    pub rebounds: Option<i32>,
    pub assists: Option<i32>,
    pub steals: Option<i32>,
    pub blocks: Option<i32>,
    pub turnovers: Option<i32>,
    pub minutes: Option<String>,
    pub did_not_play: bool,
}

impl StatLine {
    pub fn played(&self) -> bool {
        !self.did_not_play
    }
}

pub fn parse_stats(athlete: &ProviderAthlete) -> StatLine {
    let stats = &athlete.stats;
    let minutes = stats
        .get(IDX_MINUTES)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty() && m != "--");

    StatLine {
        points: stat_at(stats, IDX_POINTS),
        rebounds: stat_at(stats, IDX_REBOUNDS),
        assists: stat_at(stats, IDX_ASSISTS),
        steals: stat_at(stats, IDX_STEALS),
        blocks: stat_at(stats, IDX_BLOCKS),
        turnovers: stat_at(stats, IDX_TURNOVERS),
        did_not_play: athlete.did_not_play || !minutes_played(minutes.as_deref()),
        minutes,
    }
}

fn stat_at(stats: &[String], idx: usize) -> Option<i32> {
    let raw = stats.get(idx)?.trim();
    if raw.is_empty() || raw == "--" {
        return None;
    }
    raw.parse::<i32>().ok()
}

/// False for a missing marker and for "0", "00:00", "--" and the like.
pub fn minutes_played(minutes: Option<&str>) -> bool {
    minutes.is_some_and(|m| m.chars().any(|c| c.is_ascii_digit() && c != '0'))
}
