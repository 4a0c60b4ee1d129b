//! Find-or-create for teams and players seen in the feed.

pub mod player;
pub mod team;

pub use player::reconcile_player;
pub use team::{reconcile_team, TeamLookup};
