//! Fantasy score for a stat line.

use crate::models::PlayerGameStats;
use crate::stats::minutes_played;

pub const POINTS_WEIGHT: i32 = 1;
pub const REBOUNDS_WEIGHT: i32 = 1;
pub const ASSISTS_WEIGHT: i32 = 2;
pub const STEALS_WEIGHT: i32 = 2;
pub const BLOCKS_WEIGHT: i32 = 2;
pub const TURNOVERS_WEIGHT: i32 = -2;

/// `None` for a missing or did-not-play line. Unreported categories count 0.
pub fn compute_score(stats: Option<&PlayerGameStats>) -> Option<i32> {
    let s = stats?;
    if !minutes_played(s.minutes.as_deref()) {
        return None;
    }
    let weighted = [
        (s.points, POINTS_WEIGHT),
        (s.rebounds, REBOUNDS_WEIGHT),
        (s.assists, ASSISTS_WEIGHT),
        (s.steals, STEALS_WEIGHT),
        (s.blocks, BLOCKS_WEIGHT),
        (s.turnovers, TURNOVERS_WEIGHT),
    ];
    Some(
        weighted
            .iter()
            .map(|(value, weight)| value.unwrap_or(0) * weight)
            .sum(),
    )
}
