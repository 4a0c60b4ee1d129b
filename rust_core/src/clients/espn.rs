//! ESPN site API client and raw wire types.
//!
//! Wire types mirror the JSON loosely: nearly every field is optional because
//! ESPN omits fields freely (TBD competitors, pre-game box scores).

use crate::error::{Error, Result};
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

// ---------------------------------------------------------------------------
// Scoreboard
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScoreboardResponse {
    pub events: Option<Vec<EspnEvent>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnEvent {
    pub id: Option<String>,
    pub name: Option<String>,
    pub date: Option<String>,
    pub status: Option<EspnStatus>,
    pub competitions: Option<Vec<EspnCompetition>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnStatus {
    #[serde(rename = "type")]
    pub status_type: Option<EspnStatusType>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnStatusType {
    pub name: Option<String>,  // "STATUS_SCHEDULED", "STATUS_IN_PROGRESS", "STATUS_FINAL"
    pub state: Option<String>, // "pre", "in", "post"
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnCompetition {
    pub date: Option<String>,
    #[serde(rename = "timeValid")]
    pub time_valid: Option<bool>,
    pub status: Option<EspnStatus>,
    pub competitors: Option<Vec<EspnCompetitor>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnCompetitor {
    #[serde(rename = "homeAway")]
    pub home_away: Option<String>,
    pub team: Option<EspnTeam>,
    /// String on the scoreboard, sometimes an object elsewhere
    pub score: Option<Value>,
    pub leaders: Option<Vec<EspnLeaderCategory>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnTeam {
    pub id: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub abbreviation: Option<String>,
    pub logo: Option<String>,
    pub logos: Option<Vec<EspnLogo>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnLogo {
    pub href: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnLeaderCategory {
    pub name: Option<String>,
    pub leaders: Option<Vec<EspnLeader>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnLeader {
    pub athlete: Option<EspnAthlete>,
}

// ---------------------------------------------------------------------------
// Game summary (box score)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SummaryResponse {
    pub boxscore: Option<EspnBoxscore>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnBoxscore {
    pub players: Option<Vec<EspnTeamPlayers>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnTeamPlayers {
    pub team: Option<EspnTeam>,
    pub statistics: Option<Vec<EspnStatCategory>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnStatCategory {
    pub keys: Option<Vec<String>>,
    pub labels: Option<Vec<String>>,
    pub athletes: Option<Vec<EspnAthleteStats>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnAthleteStats {
    pub athlete: Option<EspnAthlete>,
    pub stats: Option<Vec<String>>,
    #[serde(rename = "didNotPlay")]
    pub did_not_play: Option<bool>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnAthlete {
    pub id: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    /// Plain URL on the scoreboard, `{ "href": ... }` in summaries
    pub headshot: Option<Value>,
}

impl EspnAthlete {
    pub fn headshot_url(&self) -> Option<String> {
        match self.headshot.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Object(o) => o.get("href").and_then(|h| h.as_str()).map(str::to_string),
            _ => None,
        }
    }
}

impl EspnTeam {
    pub fn logo_url(&self) -> Option<String> {
        self.logo.clone().or_else(|| {
            self.logos
                .as_ref()
                .and_then(|logos| logos.iter().find_map(|l| l.href.clone()))
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Thin HTTP client over the ESPN site API for one league.
///
/// No retries and no caching: a failed call is reported once and the caller
/// decides what it means for the unit of work.
#[derive(Debug, Clone)]
pub struct EspnClient {
    client: Client,
    base_url: String,
}

impl EspnClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("building ESPN HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the scoreboard for one calendar date.
    pub async fn get_scoreboard(&self, date: NaiveDate) -> Result<ScoreboardResponse> {
        let url = format!(
            "{}/scoreboard?dates={}&limit=100",
            self.base_url,
            date.format("%Y%m%d")
        );
        let resp = self.send(&url).await?;
        if !resp.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "{} returned {}",
                url,
                resp.status()
            )));
        }
        parse_json(resp, &url).await
    }

    /// Fetch the game summary. `None` when ESPN has no summary for the event.
    pub async fn get_summary(&self, event_id: &str) -> Result<Option<SummaryResponse>> {
        let url = format!("{}/summary?event={}", self.base_url, event_id);
        let resp = self.send(&url).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!("No summary for event {}", event_id);
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "{} returned {}",
                url,
                resp.status()
            )));
        }
        parse_json(resp, &url).await.map(Some)
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response> {
        debug!("GET {}", url);
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("request to {url} failed: {e}")))
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
    url: &str,
) -> Result<T> {
    resp.json::<T>()
        .await
        .map_err(|e| Error::UpstreamUnavailable(format!("invalid payload from {url}: {e}")))
}

/// Parse a competitor score that may be a string, a number or `{ "value": n }`.
pub fn parse_score(score: Option<&Value>) -> Option<i32> {
    match score? {
        Value::String(s) => s.trim().parse::<i32>().ok(),
        Value::Number(n) => n.as_f64().map(|v| v as i32),
        Value::Object(o) => parse_score(o.get("value")),
        _ => None,
    }
}
