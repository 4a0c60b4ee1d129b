//! Read side of the pick engine: per-pick visibility, the daily board and
//! the leaderboard.

use super::{compute_score, pick_window, PickEngine};
use crate::error::{Error, Result};
use crate::models::{Game, GroupUser, PlayerGameStats, Submission};
use chrono::{DateTime, NaiveDate, Utc};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::cmp::Reverse;
use uuid::Uuid;

/// A pick as one viewer is allowed to see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "visibility", rename_all = "snake_case")]
pub enum PickView {
    Visible {
        submission_id: i64,
        game_id: i64,
        player_id: i64,
        player_name: String,
        score: Option<i32>,
        stats: Option<PlayerGameStats>,
    },
    /// Someone else's pick before lock: only its existence is shown
    Hidden { submission_id: i64 },
}

impl PickView {
    pub fn is_visible(&self) -> bool {
        matches!(self, PickView::Visible { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberPick {
    pub user_id: Uuid,
    pub group_user_id: i64,
    pub pick: Option<PickView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyView {
    pub date: NaiveDate,
    pub games: Vec<Game>,
    pub picks: Vec<MemberPick>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: Uuid,
    pub group_user_id: i64,
    pub total: i32,
    /// Locked picks that contributed a score
    pub scored_picks: usize,
}

impl PickEngine {
    pub async fn view_pick(
        &self,
        submission: &Submission,
        viewer: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PickView> {
        let owner = self
            .store
            .group_user_by_id(submission.group_user_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("group user {}", submission.group_user_id)))?;
        let game = self.game(submission.game_id).await?;
        self.render_pick(submission, &owner, &game, viewer, now).await
    }

    async fn render_pick(
        &self,
        submission: &Submission,
        owner: &GroupUser,
        game: &Game,
        viewer: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PickView> {
        if owner.user_id != viewer && pick_window(game, now).is_open() {
            return Ok(PickView::Hidden {
                submission_id: submission.id,
            });
        }

        let player = self.player(submission.player_id).await?;
        let stats = self
            .store
            .player_stats(submission.game_id, submission.player_id)
            .await?;
        Ok(PickView::Visible {
            submission_id: submission.id,
            game_id: submission.game_id,
            player_id: player.id,
            player_name: player.name,
            score: compute_score(stats.as_ref()),
            stats,
        })
    }

    pub async fn daily_view(
        &self,
        group_id: Uuid,
        date: NaiveDate,
        viewer: Uuid,
    ) -> Result<DailyView> {
        self.daily_view_at(group_id, date, viewer, Utc::now()).await
    }

    pub async fn daily_view_at(
        &self,
        group_id: Uuid,
        date: NaiveDate,
        viewer: Uuid,
        now: DateTime<Utc>,
    ) -> Result<DailyView> {
        self.membership(viewer, group_id).await?;

        let games = self.store.games_on(date).await?;
        let members = self.store.group_users(group_id).await?;
        let submissions = self.store.group_submissions_on(group_id, date).await?;

        let mut picks = Vec::with_capacity(members.len());
        for member in &members {
            let pick = match submissions.iter().find(|s| s.group_user_id == member.id) {
                Some(submission) => {
                    let game = match games.iter().find(|g| g.id == submission.game_id) {
                        Some(g) => g.clone(),
                        None => self.game(submission.game_id).await?,
                    };
                    Some(
                        self.render_pick(submission, member, &game, viewer, now)
                            .await?,
                    )
                }
                None => None,
            };
            picks.push(MemberPick {
                user_id: member.user_id,
                group_user_id: member.id,
                pick,
            });
        }

        Ok(DailyView { date, games, picks })
    }

    pub async fn leaderboard(&self, group_id: Uuid) -> Result<Vec<LeaderboardEntry>> {
        self.leaderboard_at(group_id, Utc::now()).await
    }

    /// Totals over locked picks only, highest first, ties broken by user id.
    pub async fn leaderboard_at(
        &self,
        group_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let members = self.store.group_users(group_id).await?;
        let submissions = self.store.group_submissions(group_id).await?;

        let mut entries: FxHashMap<i64, LeaderboardEntry> = members
            .iter()
            .map(|m| {
                (
                    m.id,
                    LeaderboardEntry {
                        user_id: m.user_id,
                        group_user_id: m.id,
                        total: 0,
                        scored_picks: 0,
                    },
                )
            })
            .collect();

        let mut games: FxHashMap<i64, Game> = FxHashMap::default();
        for submission in &submissions {
            if !games.contains_key(&submission.game_id) {
                let game = self.game(submission.game_id).await?;
                games.insert(game.id, game);
            }
            let locked = games
                .get(&submission.game_id)
                .is_some_and(|g| pick_window(g, now).is_locked());
            if !locked {
                continue;
            }

            let stats = self
                .store
                .player_stats(submission.game_id, submission.player_id)
                .await?;
            if let (Some(score), Some(entry)) = (
                compute_score(stats.as_ref()),
                entries.get_mut(&submission.group_user_id),
            ) {
                entry.total += score;
                entry.scored_picks += 1;
            }
        }

        let mut board: Vec<LeaderboardEntry> = entries.into_values().collect();
        board.sort_by_key(|e| (Reverse(e.total), e.user_id));
        Ok(board)
    }
}
