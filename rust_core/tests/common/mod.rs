//! Shared fixtures: a scripted feed and provider payload builders.

#![allow(dead_code)]

pub mod racing;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use pickem_rust_core::error::{Error, Result};
use pickem_rust_core::providers::{
    HomeAway, ProviderAthlete, ProviderBoxScore, ProviderBoxTeam, ProviderCompetitor,
    ProviderEvent, ProviderPlayer, ProviderStatus, ProviderTeam, ScheduleFeed,
};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub enum BoxScript {
    Present(ProviderBoxScore),
    Absent,
    Unavailable,
}

/// Feed that replays whatever the test put in it and records box score calls.
#[derive(Default)]
pub struct ScriptedFeed {
    schedules: Mutex<FxHashMap<NaiveDate, Vec<ProviderEvent>>>,
    box_scores: Mutex<FxHashMap<String, BoxScript>>,
    schedule_down: Mutex<bool>,
    box_score_calls: Mutex<Vec<String>>,
}

impl ScriptedFeed {
    pub fn set_schedule(&self, date: NaiveDate, events: Vec<ProviderEvent>) {
        self.schedules.lock().insert(date, events);
    }

    pub fn set_box_score(&self, event_id: &str, script: BoxScript) {
        self.box_scores.lock().insert(event_id.to_string(), script);
    }

    pub fn set_schedule_down(&self, down: bool) {
        *self.schedule_down.lock() = down;
    }

    pub fn box_score_calls(&self) -> Vec<String> {
        self.box_score_calls.lock().clone()
    }
}

#[async_trait]
impl ScheduleFeed for ScriptedFeed {
    async fn fetch_schedule(&self, date: NaiveDate) -> Result<Vec<ProviderEvent>> {
        if *self.schedule_down.lock() {
            return Err(Error::UpstreamUnavailable("scoreboard returned 503".into()));
        }
        Ok(self.schedules.lock().get(&date).cloned().unwrap_or_default())
    }

    async fn fetch_box_score(&self, event_external_id: &str) -> Result<Option<ProviderBoxScore>> {
        self.box_score_calls.lock().push(event_external_id.to_string());
        match self.box_scores.lock().get(event_external_id).cloned() {
            Some(BoxScript::Present(b)) => Ok(Some(b)),
            Some(BoxScript::Unavailable) => {
                Err(Error::UpstreamUnavailable("summary returned 502".into()))
            }
            Some(BoxScript::Absent) | None => Ok(None),
        }
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn team(id: &str, name: &str, abbr: &str) -> ProviderTeam {
    ProviderTeam {
        external_id: Some(id.to_string()),
        name: name.to_string(),
        abbreviation: Some(abbr.to_string()),
        logo_url: Some(format!("https://a.espncdn.com/i/teamlogos/nba/500/{abbr}.png")),
    }
}

pub fn tbd_team() -> ProviderTeam {
    ProviderTeam {
        external_id: Some("-1".into()),
        name: "TBD".into(),
        ..Default::default()
    }
}

pub fn celtics() -> ProviderTeam {
    team("2", "Boston Celtics", "BOS")
}

pub fn knicks() -> ProviderTeam {
    team("18", "New York Knicks", "NY")
}

pub fn nuggets() -> ProviderTeam {
    team("7", "Denver Nuggets", "DEN")
}

pub fn player(id: &str, name: &str) -> ProviderPlayer {
    ProviderPlayer {
        external_id: Some(id.to_string()),
        name: name.to_string(),
        image_url: None,
    }
}

pub fn event(
    id: &str,
    when: &str,
    status: &str,
    home: ProviderTeam,
    away: ProviderTeam,
    scores: Option<(i32, i32)>,
) -> ProviderEvent {
    let side = |home_away, team, score| ProviderCompetitor {
        home_away,
        team,
        score,
        leaders: vec![],
    };
    ProviderEvent {
        external_id: Some(id.to_string()),
        date: Some(when.to_string()),
        time_valid: true,
        status: ProviderStatus {
            name: status.to_string(),
            state: None,
            completed: status == "STATUS_FINAL",
        },
        competitors: vec![
            side(HomeAway::Home, home, scores.map(|s| s.0)),
            side(HomeAway::Away, away, scores.map(|s| s.1)),
        ],
    }
}

/// Athlete line with `[min, reb, ast, stl, blk, to, pts]` placed at the
/// ESPN positions.
#[allow(clippy::too_many_arguments)]
pub fn line(
    who: ProviderPlayer,
    min: &str,
    reb: &str,
    ast: &str,
    stl: &str,
    blk: &str,
    to: &str,
    pts: &str,
) -> ProviderAthlete {
    ProviderAthlete {
        player: who,
        did_not_play: false,
        stats: vec![
            min.into(),
            "0-0".into(),
            "0-0".into(),
            "0-0".into(),
            "0".into(),
            "0".into(),
            reb.into(),
            ast.into(),
            stl.into(),
            blk.into(),
            to.into(),
            "0".into(),
            "+0".into(),
            pts.into(),
        ],
    }
}

pub fn dnp(who: ProviderPlayer) -> ProviderAthlete {
    ProviderAthlete {
        player: who,
        did_not_play: true,
        stats: vec![],
    }
}

pub fn box_score(sides: Vec<(ProviderTeam, Vec<ProviderAthlete>)>) -> ProviderBoxScore {
    ProviderBoxScore {
        teams: sides
            .into_iter()
            .map(|(team, athletes)| ProviderBoxTeam { team, athletes })
            .collect(),
    }
}
