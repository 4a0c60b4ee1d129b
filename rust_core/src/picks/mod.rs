//! Pick submission rules, scoring and visibility.
//!
//! Every check re-reads the stored game, so the lock decision is always made
//! against the latest ingested status. Storage uniqueness constraints back up
//! the per-day and per-player rules when two requests race.

pub mod scoring;
pub mod views;
pub mod window;

use crate::db::{constraints, Store, StoreError};
use crate::error::{Error, Result};
use crate::models::{Game, GroupUser, NewSubmission, Player, Submission};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub use scoring::compute_score;
pub use views::{DailyView, LeaderboardEntry, MemberPick, PickView};
pub use window::{pick_window, PickWindow};

pub struct PickEngine {
    store: Arc<dyn Store>,
}

impl PickEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn submit_pick(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        game_id: i64,
        player_id: i64,
    ) -> Result<Submission> {
        self.submit_pick_at(user_id, group_id, game_id, player_id, Utc::now())
            .await
    }

    pub async fn submit_pick_at(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        game_id: i64,
        player_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Submission> {
        let member = self.membership(user_id, group_id).await?;
        let game = self.game(game_id).await?;
        let player = self.player(player_id).await?;

        ensure_open(&game, now)?;

        if let Some(used) = self
            .store
            .submission_for_player(member.id, player.id)
            .await?
        {
            if used.game_id != game.id {
                return Err(Error::PlayerAlreadyUsed { player_id: player.id });
            }
        }
        if self
            .store
            .submission_on_day(member.id, game.game_date)
            .await?
            .is_some()
        {
            return Err(Error::DayAlreadyPicked { date: game.game_date });
        }

        let new = NewSubmission {
            group_user_id: member.id,
            game_id: game.id,
            player_id: player.id,
            game_date: game.game_date,
        };
        let submission = self
            .store
            .insert_submission(&new)
            .await
            .map_err(|e| submission_conflict(e, &new))?;
        info!(
            "Group user {} picked player {} in game {}",
            member.id, player.id, game.id
        );
        Ok(submission)
    }

    /// Replace the same-day pick while both the old and the new game are open.
    pub async fn change_pick(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        date: NaiveDate,
        game_id: i64,
        player_id: i64,
    ) -> Result<Submission> {
        self.change_pick_at(user_id, group_id, date, game_id, player_id, Utc::now())
            .await
    }

    pub async fn change_pick_at(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        date: NaiveDate,
        game_id: i64,
        player_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Submission> {
        let member = self.membership(user_id, group_id).await?;
        let existing = self
            .store
            .submission_on_day(member.id, date)
            .await?
            .ok_or_else(|| Error::not_found(format!("pick on {date}")))?;
        let game = self.game(game_id).await?;
        let player = self.player(player_id).await?;

        if game.game_date != date {
            return Err(Error::Validation(format!(
                "game {} is on {}, not {}",
                game.id, game.game_date, date
            )));
        }
        let current_game = self.game(existing.game_id).await?;
        ensure_open(&current_game, now)?;
        ensure_open(&game, now)?;

        if let Some(used) = self
            .store
            .submission_for_player(member.id, player.id)
            .await?
        {
            if used.id != existing.id {
                return Err(Error::PlayerAlreadyUsed { player_id: player.id });
            }
        }

        let new = NewSubmission {
            group_user_id: member.id,
            game_id: game.id,
            player_id: player.id,
            game_date: date,
        };
        let submission = self
            .store
            .update_submission(existing.id, &new)
            .await
            .map_err(|e| submission_conflict(e, &new))?;
        info!(
            "Group user {} changed pick {} to player {} in game {}",
            member.id, existing.id, player.id, game.id
        );
        Ok(submission)
    }

    /// Privileged override. Resolves the player's game on `date` and writes
    /// the pick regardless of lock state, replacing any same-day pick.
    ///
    /// A player already used on another day is still rejected by the storage
    /// constraint.
    pub async fn admin_upsert_pick(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        date: NaiveDate,
        player_id: i64,
    ) -> Result<Submission> {
        let member = self.membership(user_id, group_id).await?;
        let player = self.player(player_id).await?;
        let team_id = player.team_id.ok_or_else(|| {
            Error::Validation(format!("player {} has no current team", player.id))
        })?;

        let games: Vec<Game> = self
            .store
            .games_on(date)
            .await?
            .into_iter()
            .filter(|g| g.involves_team(team_id))
            .collect();
        let game = match games.as_slice() {
            [] => {
                return Err(Error::not_found(format!(
                    "game for team {team_id} on {date}"
                )))
            }
            [game] => game,
            many => {
                let ids: Vec<String> = many.iter().map(|g| g.id.to_string()).collect();
                return Err(Error::Validation(format!(
                    "team {} plays {} games on {}: {}",
                    team_id,
                    many.len(),
                    date,
                    ids.join(", ")
                )));
            }
        };

        let new = NewSubmission {
            group_user_id: member.id,
            game_id: game.id,
            player_id: player.id,
            game_date: game.game_date,
        };
        let result = match self.store.submission_on_day(member.id, date).await? {
            Some(existing) => self.store.update_submission(existing.id, &new).await,
            None => self.store.insert_submission(&new).await,
        };
        let submission = result.map_err(|e| submission_conflict(e, &new))?;
        warn!(
            "Admin override: group user {} set to player {} in game {} on {}",
            member.id, player.id, game.id, date
        );
        Ok(submission)
    }

    async fn membership(&self, user_id: Uuid, group_id: Uuid) -> Result<GroupUser> {
        self.store
            .group_user(user_id, group_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("membership of {user_id} in {group_id}")))
    }

    async fn game(&self, game_id: i64) -> Result<Game> {
        self.store
            .game(game_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("game {game_id}")))
    }

    async fn player(&self, player_id: i64) -> Result<Player> {
        self.store
            .player(player_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("player {player_id}")))
    }
}

fn ensure_open(game: &Game, now: DateTime<Utc>) -> Result<()> {
    if pick_window(game, now).is_locked() {
        return Err(Error::PickLocked { game_id: game.id });
    }
    Ok(())
}

/// Translate a lost uniqueness race into the rule it violated.
fn submission_conflict(err: StoreError, new: &NewSubmission) -> Error {
    if err.is_conflict_on(constraints::SUBMISSIONS_GROUP_USER_DAY) {
        Error::DayAlreadyPicked { date: new.game_date }
    } else if err.is_conflict_on(constraints::SUBMISSIONS_GROUP_USER_PLAYER) {
        Error::PlayerAlreadyUsed { player_id: new.player_id }
    } else {
        err.into()
    }
}
