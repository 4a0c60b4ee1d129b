//! Per-date ingestion: schedule -> teams -> game -> box score -> stat lines.
//!
//! Events are processed one at a time and isolated from each other. Every
//! write is an upsert keyed by provider identity, so a date can be re-ingested
//! any number of times.

use crate::db::Store;
use crate::error::{Error, Result};
use crate::models::{GameFields, PlayerGameStats, Team};
use crate::providers::{ProviderBoxScore, ProviderCompetitor, ProviderEvent, ScheduleFeed};
use crate::reconcile::{reconcile_player, reconcile_team};
use crate::stats::parse_stats;
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one `ingest_date` call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub date: Option<NaiveDate>,
    pub processed: usize,
    pub failed: usize,
    pub stat_rows: usize,
    pub errors: Vec<IngestIssue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestIssue {
    pub event_id: Option<String>,
    pub message: String,
    /// Soft issues (e.g. box score unavailable) do not fail the event
    pub soft: bool,
}

impl BatchResult {
    fn for_date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Default::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.errors.is_empty()
    }
}

pub struct Ingestor {
    feed: Arc<dyn ScheduleFeed>,
    store: Arc<dyn Store>,
    tz: Tz,
}

impl Ingestor {
    pub fn new(feed: Arc<dyn ScheduleFeed>, store: Arc<dyn Store>, tz: Tz) -> Self {
        Self { feed, store, tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Ingest every event the feed lists for `date`.
    ///
    /// Fails as a whole only when the schedule itself cannot be fetched.
    pub async fn ingest_date(&self, date: NaiveDate) -> Result<BatchResult> {
        let events = self.feed.fetch_schedule(date).await.map_err(|e| {
            warn!("{} schedule for {} unavailable: {}", self.feed.provider_name(), date, e);
            match e {
                Error::UpstreamUnavailable(_) => e,
                other => Error::UpstreamUnavailable(other.to_string()),
            }
        })?;

        let mut batch = BatchResult::for_date(date);
        for event in &events {
            match self.ingest_event(event, &mut batch).await {
                Ok(rows) => {
                    batch.processed += 1;
                    batch.stat_rows += rows;
                }
                Err(e) => {
                    warn!("Event {:?} on {} failed: {}", event.external_id, date, e);
                    batch.failed += 1;
                    batch.errors.push(IngestIssue {
                        event_id: event.external_id.clone(),
                        message: e.to_string(),
                        soft: false,
                    });
                }
            }
        }

        info!(
            "Ingested {}: {} events, {} processed, {} failed, {} stat rows",
            date,
            events.len(),
            batch.processed,
            batch.failed,
            batch.stat_rows
        );
        Ok(batch)
    }

    /// Returns the number of stat rows written.
    async fn ingest_event(&self, event: &ProviderEvent, batch: &mut BatchResult) -> Result<usize> {
        let store = self.store.as_ref();
        let external_id = event
            .external_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| Error::Validation("event without an id".to_string()))?;
        let (home, away) = match (event.home(), event.away()) {
            (Some(h), Some(a)) => (h, a),
            _ => {
                return Err(Error::Validation(format!(
                    "event {external_id} is missing a home or away competitor"
                )))
            }
        };

        let home_team = reconcile_team(store, &home.team).await?;
        let away_team = reconcile_team(store, &away.team).await?;
        self.reconcile_leaders(home, &home_team).await?;
        self.reconcile_leaders(away, &away_team).await?;

        let started = event.status.has_started();
        let game = store
            .upsert_game(&GameFields {
                external_id: external_id.to_string(),
                game_date: event.civil_date(self.tz)?,
                start_time: event.start_time(),
                status: event.status.name.clone(),
                home_team_id: home_team.id,
                away_team_id: away_team.id,
                home_score: home.score.filter(|_| started),
                away_score: away.score.filter(|_| started),
            })
            .await?;
        debug!("Upserted game {} ({}) {}", game.id, external_id, game.status);

        if !started {
            return Ok(0);
        }

        let box_score = match self.feed.fetch_box_score(external_id).await {
            Ok(Some(box_score)) => box_score,
            Ok(None) => {
                debug!("No box score yet for {}", external_id);
                return Ok(0);
            }
            Err(e) => {
                warn!("Box score for {} unavailable: {}", external_id, e);
                batch.errors.push(IngestIssue {
                    event_id: Some(external_id.to_string()),
                    message: e.to_string(),
                    soft: true,
                });
                return Ok(0);
            }
        };

        let rows = self.write_box_score(game.id, &box_score).await?;
        if rows > 0 {
            store.mark_stats_processed(game.id).await?;
        }
        Ok(rows)
    }

    async fn reconcile_leaders(&self, competitor: &ProviderCompetitor, team: &Team) -> Result<()> {
        let team_id = (!team.is_placeholder).then_some(team.id);
        for leader in &competitor.leaders {
            reconcile_player(self.store.as_ref(), leader, team_id).await?;
        }
        Ok(())
    }

    async fn write_box_score(&self, game_id: i64, box_score: &ProviderBoxScore) -> Result<usize> {
        let store = self.store.as_ref();
        let mut rows = 0;
        for side in &box_score.teams {
            let team = reconcile_team(store, &side.team).await?;
            let team_id = (!team.is_placeholder).then_some(team.id);

            for athlete in &side.athletes {
                let line = parse_stats(athlete);
                if line.did_not_play {
                    continue;
                }
                let Some(player) = reconcile_player(store, &athlete.player, team_id).await? else {
                    continue;
                };
                store
                    .upsert_player_stats(&PlayerGameStats {
                        game_id,
                        player_id: player.id,
                        points: line.points,
                        rebounds: line.rebounds,
                        assists: line.assists,
                        steals: line.steals,
                        blocks: line.blocks,
                        turnovers: line.turnovers,
                        minutes: line.minutes,
                    })
                    .await?;
                rows += 1;
            }
        }
        Ok(rows)
    }
}
