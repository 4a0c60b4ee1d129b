//! ESPN schedule feed.
//!
//! Maps the ESPN scoreboard and summary payloads onto provider events and box
//! scores. Fields ESPN leaves out stay `None`; deciding what that means is up
//! to the orchestrator.

use super::{
    HomeAway, ProviderAthlete, ProviderBoxScore, ProviderBoxTeam, ProviderCompetitor,
    ProviderEvent, ProviderPlayer, ProviderStatus, ProviderTeam, ScheduleFeed,
};
use crate::clients::espn::{
    parse_score, EspnAthlete, EspnClient, EspnCompetitor, EspnEvent, EspnTeam, ScoreboardResponse,
    SummaryResponse,
};
use crate::error::Result;
use crate::league_config::LeagueConfig;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tracing::{debug, warn};

/// ESPN feed for a single league.
pub struct EspnScheduleFeed {
    client: EspnClient,
}

impl EspnScheduleFeed {
    pub fn new(client: EspnClient) -> Self {
        Self { client }
    }

    /// Feed for a configured league, optionally pointed at another base URL.
    pub fn for_league(
        league: &LeagueConfig,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let base = base_url
            .map(str::to_string)
            .unwrap_or_else(|| league.espn_base_url());
        Ok(Self::new(EspnClient::new(base, timeout)?))
    }
}

#[async_trait]
impl ScheduleFeed for EspnScheduleFeed {
    async fn fetch_schedule(&self, date: NaiveDate) -> Result<Vec<ProviderEvent>> {
        let board = self.client.get_scoreboard(date).await?;
        let events = scoreboard_to_events(board);
        debug!("ESPN scoreboard {} returned {} events", date, events.len());
        Ok(events)
    }

    async fn fetch_box_score(&self, event_external_id: &str) -> Result<Option<ProviderBoxScore>> {
        Ok(self
            .client
            .get_summary(event_external_id)
            .await?
            .and_then(summary_to_box_score))
    }

    fn provider_name(&self) -> &str {
        "ESPN"
    }
}

pub fn scoreboard_to_events(board: ScoreboardResponse) -> Vec<ProviderEvent> {
    board
        .events
        .unwrap_or_default()
        .into_iter()
        .map(event_from_espn)
        .collect()
}

fn event_from_espn(event: EspnEvent) -> ProviderEvent {
    let competition = event
        .competitions
        .and_then(|comps| comps.into_iter().next())
        .unwrap_or_default();

    // Competition-level status is the live one; event-level is the fallback
    let status_type = competition
        .status
        .and_then(|s| s.status_type)
        .or_else(|| event.status.and_then(|s| s.status_type))
        .unwrap_or_default();

    let competitors = competition
        .competitors
        .unwrap_or_default()
        .into_iter()
        .filter_map(competitor_from_espn)
        .collect();

    ProviderEvent {
        external_id: event.id,
        date: competition.date.or(event.date),
        time_valid: competition.time_valid.unwrap_or(true),
        status: ProviderStatus {
            name: status_type.name.unwrap_or_default(),
            state: status_type.state,
            completed: status_type.completed.unwrap_or(false),
        },
        competitors,
    }
}

fn competitor_from_espn(c: EspnCompetitor) -> Option<ProviderCompetitor> {
    let home_away = match c.home_away.as_deref() {
        Some("home") => HomeAway::Home,
        Some("away") => HomeAway::Away,
        other => {
            warn!("Skipping competitor with homeAway {:?}", other);
            return None;
        }
    };

    let leaders = c
        .leaders
        .unwrap_or_default()
        .into_iter()
        .flat_map(|category| category.leaders.unwrap_or_default())
        .filter_map(|leader| leader.athlete)
        .map(player_from_espn)
        .collect();

    Some(ProviderCompetitor {
        home_away,
        team: c.team.map(team_from_espn).unwrap_or_default(),
        score: parse_score(c.score.as_ref()),
        leaders,
    })
}

fn team_from_espn(team: EspnTeam) -> ProviderTeam {
    let logo_url = team.logo_url();
    ProviderTeam {
        external_id: team.id,
        name: team.display_name.unwrap_or_default(),
        abbreviation: team.abbreviation,
        logo_url,
    }
}

fn player_from_espn(athlete: EspnAthlete) -> ProviderPlayer {
    let image_url = athlete.headshot_url();
    ProviderPlayer {
        external_id: athlete.id,
        name: athlete.display_name.unwrap_or_default(),
        image_url,
    }
}

/// `None` when the summary carries no player section yet.
pub fn summary_to_box_score(summary: SummaryResponse) -> Option<ProviderBoxScore> {
    let players = summary.boxscore?.players?;
    if players.is_empty() {
        return None;
    }

    let teams = players
        .into_iter()
        .map(|side| {
            let athletes = side
                .statistics
                .unwrap_or_default()
                .into_iter()
                .flat_map(|category| category.athletes.unwrap_or_default())
                .map(|entry| ProviderAthlete {
                    player: entry.athlete.map(player_from_espn).unwrap_or_default(),
                    did_not_play: entry.did_not_play.unwrap_or(false),
                    stats: entry.stats.unwrap_or_default(),
                })
                .collect();
            ProviderBoxTeam {
                team: side.team.map(team_from_espn).unwrap_or_default(),
                athletes,
            }
        })
        .collect();

    Some(ProviderBoxScore { teams })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn scoreboard_fixture() -> ScoreboardResponse {
        serde_json::from_value(json!({
            "events": [{
                "id": "401768001",
                "date": "2025-05-01T02:30Z",
                "status": {"type": {"name": "STATUS_SCHEDULED", "state": "pre", "completed": false}},
                "competitions": [{
                    "date": "2025-05-01T02:30Z",
                    "timeValid": true,
                    "competitors": [
                        {
                            "homeAway": "home",
                            "score": "0",
                            "team": {"id": "2", "displayName": "Boston Celtics", "abbreviation": "BOS",
                                     "logo": "https://a.espncdn.com/bos.png"},
                            "leaders": [{
                                "name": "points",
                                "leaders": [{"athlete": {"id": "4065648", "displayName": "Jayson Tatum",
                                                         "headshot": "https://a.espncdn.com/tatum.png"}}]
                            }]
                        },
                        {
                            "homeAway": "away",
                            "score": "0",
                            "team": {"id": "-1", "displayName": "TBD"}
                        }
                    ]
                }]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_for_league_uses_configured_base_url() {
        let nba = crate::league_config::get_league_config("nba").unwrap();
        let feed = EspnScheduleFeed::for_league(nba, None, Duration::from_secs(10)).unwrap();
        assert_eq!(feed.client.base_url(), nba.espn_base_url());

        let local =
            EspnScheduleFeed::for_league(nba, Some("http://127.0.0.1:9/"), Duration::from_millis(250))
                .unwrap();
        assert_eq!(local.client.base_url(), "http://127.0.0.1:9");
    }

    #[test]
    fn test_scoreboard_mapping() {
        let events = scoreboard_to_events(scoreboard_fixture());
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.external_id.as_deref(), Some("401768001"));
        assert_eq!(event.status.name, "STATUS_SCHEDULED");
        assert!(event.is_tbd());

        let home = event.home().unwrap();
        assert_eq!(home.team.abbreviation.as_deref(), Some("BOS"));
        assert_eq!(home.score, Some(0));
        assert_eq!(home.leaders.len(), 1);
        assert_eq!(home.leaders[0].external_id.as_deref(), Some("4065648"));
        assert!(event.away().unwrap().team.is_placeholder());
    }

    #[test]
    fn test_summary_without_players_is_absent() {
        let summary: SummaryResponse = serde_json::from_value(json!({"boxscore": {}})).unwrap();
        assert!(summary_to_box_score(summary).is_none());

        let summary: SummaryResponse = serde_json::from_value(json!({})).unwrap();
        assert!(summary_to_box_score(summary).is_none());
    }

    #[test]
    fn test_summary_mapping() {
        let summary: SummaryResponse = serde_json::from_value(json!({
            "boxscore": {"players": [{
                "team": {"id": "2", "displayName": "Boston Celtics"},
                "statistics": [{
                    "keys": ["minutes", "fieldGoalsMade-fieldGoalsAttempted"],
                    "athletes": [
                        {"athlete": {"id": "4065648", "displayName": "Jayson Tatum",
                                     "headshot": {"href": "https://a.espncdn.com/tatum.png"}},
                         "stats": ["38", "10-22", "3-9", "4-4", "1", "9", "10", "6", "2", "1", "3", "2", "+8", "27"]},
                        {"athlete": {"id": "3", "displayName": "Bench Guy"},
                         "didNotPlay": true, "reason": "COACH'S DECISION", "stats": []}
                    ]
                }]
            }]}
        }))
        .unwrap();

        let box_score = summary_to_box_score(summary).unwrap();
        assert_eq!(box_score.teams.len(), 1);
        let athletes = &box_score.teams[0].athletes;
        assert_eq!(athletes.len(), 2);
        assert_eq!(
            athletes[0].player.image_url.as_deref(),
            Some("https://a.espncdn.com/tatum.png")
        );
        assert_eq!(athletes[0].stats[13], "27");
        assert!(athletes[1].did_not_play);
    }

    #[tokio::test]
    async fn test_fetch_schedule_over_http() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/scoreboard")
            .match_query(Matcher::UrlEncoded("dates".into(), "20250430".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"events":[{"id":"1","competitions":[{"competitors":[]}]}]}"#)
            .create_async()
            .await;

        let feed = EspnScheduleFeed::new(EspnClient::new(server.url(), Duration::from_secs(5)).unwrap());
        let events = feed
            .fetch_schedule(NaiveDate::from_ymd_opt(2025, 4, 30).unwrap())
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].home().is_none());
        assert_eq!(feed.provider_name(), "ESPN");
    }
}
