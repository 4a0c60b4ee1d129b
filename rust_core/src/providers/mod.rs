//! Schedule feed abstraction.
//!
//! Defines the `ScheduleFeed` trait that the ingestion orchestrator pulls
//! from, and the provider-shaped payloads it returns. Nothing in here touches
//! storage.

use crate::error::{Error, Result};
use crate::models::GameStatus;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub mod espn;

pub use espn::EspnScheduleFeed;

/// Source of schedule events and box scores for one league.
#[async_trait]
pub trait ScheduleFeed: Send + Sync {
    /// All events on the provider's scoreboard for `date`.
    async fn fetch_schedule(&self, date: NaiveDate) -> Result<Vec<ProviderEvent>>;

    /// Box score for an event, `None` when the provider has none yet.
    async fn fetch_box_score(&self, event_external_id: &str) -> Result<Option<ProviderBoxScore>>;

    /// Provider name for logging
    fn provider_name(&self) -> &str;
}

/// One scheduled matchup as reported by the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub external_id: Option<String>,
    /// Raw provider timestamp, e.g. `2025-05-01T02:30Z`
    pub date: Option<String>,
    /// False while the tip-off time is not set
    pub time_valid: bool,
    pub status: ProviderStatus,
    pub competitors: Vec<ProviderCompetitor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub name: String,
    pub state: Option<String>,
    pub completed: bool,
}

impl ProviderStatus {
    /// True once the game has left the "not yet started" state.
    ///
    /// ESPN's `state` (`pre`/`in`/`post`) decides when present. A postponed
    /// game reports `post` without completing, so it is kept as not started.
    /// Without a state, only a recognized scheduled or postponed status name
    /// counts as not started.
    pub fn has_started(&self) -> bool {
        let lifecycle = GameStatus::from_provider(&self.name);
        if lifecycle == GameStatus::Postponed && !self.completed {
            return false;
        }
        match self.state.as_deref().map(str::trim) {
            Some(state) if state.eq_ignore_ascii_case("pre") => false,
            Some(state) if !state.is_empty() => true,
            _ => !lifecycle.is_scheduled() && lifecycle != GameStatus::Postponed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeAway {
    Home,
    Away,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCompetitor {
    pub home_away: HomeAway,
    pub team: ProviderTeam,
    pub score: Option<i32>,
    /// Statistical leaders listed on the scoreboard
    pub leaders: Vec<ProviderPlayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTeam {
    pub external_id: Option<String>,
    pub name: String,
    pub abbreviation: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPlayer {
    pub external_id: Option<String>,
    pub name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderBoxScore {
    pub teams: Vec<ProviderBoxTeam>,
}

/// One side of a box score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderBoxTeam {
    pub team: ProviderTeam,
    pub athletes: Vec<ProviderAthlete>,
}

/// One athlete's raw stat block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderAthlete {
    pub player: ProviderPlayer,
    pub did_not_play: bool,
    /// Positional values, `MIN` first
    pub stats: Vec<String>,
}

impl ProviderTeam {
    /// Placeholder slot for an opponent that is not decided yet.
    ///
    /// A missing external id alone does not make a placeholder; such teams
    /// are matched by name.
    pub fn is_placeholder(&self) -> bool {
        let name = self.name.trim();
        self.external_id.as_deref().map(str::trim) == Some("-1")
            || name.is_empty()
            || name.eq_ignore_ascii_case("TBD")
            || name.eq_ignore_ascii_case("TBA")
    }
}

impl ProviderEvent {
    pub fn home(&self) -> Option<&ProviderCompetitor> {
        self.side(HomeAway::Home)
    }

    pub fn away(&self) -> Option<&ProviderCompetitor> {
        self.side(HomeAway::Away)
    }

    fn side(&self, side: HomeAway) -> Option<&ProviderCompetitor> {
        self.competitors.iter().find(|c| c.home_away == side)
    }

    /// True while the matchup or its tip-off time is undetermined.
    pub fn is_tbd(&self) -> bool {
        !self.time_valid || self.competitors.iter().any(|c| c.team.is_placeholder())
    }

    /// Parsed provider timestamp, regardless of TBD state.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.date.as_deref().and_then(parse_provider_instant)
    }

    /// Scheduled start, `None` when the matchup is TBD.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        if self.is_tbd() {
            None
        } else {
            self.instant()
        }
    }

    /// Calendar date of the event in the league's home time zone.
    pub fn civil_date(&self, tz: Tz) -> Result<NaiveDate> {
        let instant = self.instant().ok_or_else(|| {
            Error::Validation(format!(
                "event {} has unparseable date {:?}",
                self.external_id.as_deref().unwrap_or("?"),
                self.date
            ))
        })?;
        Ok(civil_date(instant, tz))
    }
}

/// Parse an ESPN timestamp. Accepts RFC 3339 and the minute-precision
/// `YYYY-MM-DDTHH:MMZ` form.
pub fn parse_provider_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Convert an instant to the civil date observed in `tz`.
pub fn civil_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}
