//! In-process `Store` with the same uniqueness constraints as the schema.
//!
//! Used for tests and dry runs. Each call takes the table lock once, so every
//! check-then-write below is atomic with respect to other callers, the same
//! guarantee the Postgres constraints give.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::warn;
use uuid::Uuid;

use super::{constraints, Store, StoreError, StoreResult};
use crate::models::{
    Game, GameFields, GameStatus, GroupUser, NewSubmission, Player, PlayerFields,
    PlayerGameStats, Submission, Team, TeamFields,
};

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    teams: FxHashMap<i64, Team>,
    players: FxHashMap<i64, Player>,
    games: FxHashMap<i64, Game>,
    stats: FxHashMap<(i64, i64), PlayerGameStats>,
    group_users: FxHashMap<i64, GroupUser>,
    submissions: FxHashMap<i64, Submission>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_team_unique(&self, id: Option<i64>, fields: &TeamFields) -> StoreResult<()> {
        for team in self.teams.values().filter(|t| Some(t.id) != id) {
            if team.name == fields.name {
                return Err(StoreError::conflict(constraints::TEAMS_NAME));
            }
            if fields.external_id.is_some() && team.external_id == fields.external_id {
                return Err(StoreError::conflict(constraints::TEAMS_EXTERNAL_ID));
            }
        }
        Ok(())
    }

    fn check_submission_unique(&self, id: Option<i64>, new: &NewSubmission) -> StoreResult<()> {
        for s in self
            .submissions
            .values()
            .filter(|s| Some(s.id) != id && s.group_user_id == new.group_user_id)
        {
            if s.game_date == new.game_date {
                return Err(StoreError::conflict(constraints::SUBMISSIONS_GROUP_USER_DAY));
            }
            if s.player_id == new.player_id {
                return Err(StoreError::conflict(
                    constraints::SUBMISSIONS_GROUP_USER_PLAYER,
                ));
            }
        }
        Ok(())
    }

    /// Move a rescheduled game's picks to its new date. A pick whose member
    /// already has another pick on that date is removed and returned.
    fn carry_picks(&mut self, game_id: i64, date: NaiveDate) -> Vec<Submission> {
        let moved: Vec<i64> = self
            .submissions
            .values()
            .filter(|s| s.game_id == game_id && s.game_date != date)
            .map(|s| s.id)
            .collect();

        let mut dropped = Vec::new();
        for id in moved {
            let Some(member) = self.submissions.get(&id).map(|s| s.group_user_id) else {
                continue;
            };
            let taken = self
                .submissions
                .values()
                .any(|s| s.id != id && s.group_user_id == member && s.game_date == date);
            if taken {
                dropped.extend(self.submissions.remove(&id));
            } else if let Some(s) = self.submissions.get_mut(&id) {
                s.game_date = date;
            }
        }
        dropped
    }

    fn group_member_ids(&self, group_id: Uuid) -> Vec<i64> {
        self.group_users
            .values()
            .filter(|gu| gu.group_id == group_id)
            .map(|gu| gu.id)
            .collect()
    }
}

/// Row counts per table, for asserting idempotency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCounts {
    pub teams: usize,
    pub players: usize,
    pub games: usize,
    pub stats: usize,
    pub group_users: usize,
    pub submissions: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> TableCounts {
        let t = self.tables.lock();
        TableCounts {
            teams: t.teams.len(),
            players: t.players.len(),
            games: t.games.len(),
            stats: t.stats.len(),
            group_users: t.group_users.len(),
            submissions: t.submissions.len(),
        }
    }

    /// Overwrite a game's status and start time, bypassing ingestion.
    pub fn set_game_state(
        &self,
        game_id: i64,
        status: &str,
        start_time: Option<chrono::DateTime<Utc>>,
    ) {
        if let Some(game) = self.tables.lock().games.get_mut(&game_id) {
            game.status = status.to_string();
            game.start_time = start_time;
        }
    }

    /// All games ordered by id.
    pub fn all_games(&self) -> Vec<Game> {
        let mut games: Vec<Game> = self.tables.lock().games.values().cloned().collect();
        games.sort_by_key(|g| g.id);
        games
    }

    /// All teams ordered by id.
    pub fn all_teams(&self) -> Vec<Team> {
        let mut teams: Vec<Team> = self.tables.lock().teams.values().cloned().collect();
        teams.sort_by_key(|t| t.id);
        teams
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn team(&self, id: i64) -> StoreResult<Option<Team>> {
        Ok(self.tables.lock().teams.get(&id).cloned())
    }

    async fn team_by_external_id(&self, external_id: &str) -> StoreResult<Option<Team>> {
        Ok(self
            .tables
            .lock()
            .teams
            .values()
            .find(|t| t.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn team_by_name(&self, name: &str) -> StoreResult<Option<Team>> {
        Ok(self
            .tables
            .lock()
            .teams
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn placeholder_team(&self) -> StoreResult<Option<Team>> {
        Ok(self
            .tables
            .lock()
            .teams
            .values()
            .find(|t| t.is_placeholder)
            .cloned())
    }

    async fn insert_team(&self, team: &TeamFields, is_placeholder: bool) -> StoreResult<Team> {
        let mut t = self.tables.lock();
        t.check_team_unique(None, team)?;
        if is_placeholder && t.teams.values().any(|x| x.is_placeholder) {
            return Err(StoreError::conflict(constraints::TEAMS_SINGLE_PLACEHOLDER));
        }

        let row = Team {
            id: t.next_id(),
            external_id: team.external_id.clone(),
            name: team.name.clone(),
            abbreviation: team.abbreviation.clone(),
            logo_url: team.logo_url.clone(),
            is_placeholder,
        };
        t.teams.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_team(&self, id: i64, team: &TeamFields) -> StoreResult<Team> {
        let mut t = self.tables.lock();
        let existing = t
            .teams
            .get(&id)
            .cloned()
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;

        let merged = TeamFields {
            external_id: existing.external_id.clone().or_else(|| team.external_id.clone()),
            name: team.name.clone(),
            abbreviation: team.abbreviation.clone().or(existing.abbreviation.clone()),
            logo_url: team.logo_url.clone().or(existing.logo_url.clone()),
        };
        t.check_team_unique(Some(id), &merged)?;

        let row = Team {
            id,
            external_id: merged.external_id,
            name: merged.name,
            abbreviation: merged.abbreviation,
            logo_url: merged.logo_url,
            is_placeholder: existing.is_placeholder,
        };
        t.teams.insert(id, row.clone());
        Ok(row)
    }

    async fn player(&self, id: i64) -> StoreResult<Option<Player>> {
        Ok(self.tables.lock().players.get(&id).cloned())
    }

    async fn player_by_external_id(&self, external_id: &str) -> StoreResult<Option<Player>> {
        Ok(self
            .tables
            .lock()
            .players
            .values()
            .find(|p| p.external_id == external_id)
            .cloned())
    }

    async fn upsert_player(&self, player: &PlayerFields) -> StoreResult<Player> {
        let mut t = self.tables.lock();
        let existing = t
            .players
            .values()
            .find(|p| p.external_id == player.external_id)
            .cloned();

        let row = match existing {
            Some(p) => Player {
                id: p.id,
                external_id: p.external_id,
                name: player.name.clone(),
                team_id: player.team_id.or(p.team_id),
                image_url: player.image_url.clone().or(p.image_url),
            },
            None => Player {
                id: t.next_id(),
                external_id: player.external_id.clone(),
                name: player.name.clone(),
                team_id: player.team_id,
                image_url: player.image_url.clone(),
            },
        };
        t.players.insert(row.id, row.clone());
        Ok(row)
    }

    async fn game(&self, id: i64) -> StoreResult<Option<Game>> {
        Ok(self.tables.lock().games.get(&id).cloned())
    }

    async fn game_by_external_id(&self, external_id: &str) -> StoreResult<Option<Game>> {
        Ok(self
            .tables
            .lock()
            .games
            .values()
            .find(|g| g.external_id == external_id)
            .cloned())
    }

    async fn upsert_game(&self, game: &GameFields) -> StoreResult<Game> {
        let mut t = self.tables.lock();
        let existing = t
            .games
            .values()
            .find(|g| g.external_id == game.external_id)
            .cloned();

        let rescheduled = existing
            .as_ref()
            .is_some_and(|g| g.game_date != game.game_date);

        let row = match existing {
            Some(g) => Game {
                id: g.id,
                external_id: g.external_id,
                game_date: game.game_date,
                start_time: game.start_time,
                status: game.status.clone(),
                home_team_id: game.home_team_id,
                away_team_id: game.away_team_id,
                home_score: game.home_score.or(g.home_score),
                away_score: game.away_score.or(g.away_score),
                stats_processed: g.stats_processed,
            },
            None => Game {
                id: t.next_id(),
                external_id: game.external_id.clone(),
                game_date: game.game_date,
                start_time: game.start_time,
                status: game.status.clone(),
                home_team_id: game.home_team_id,
                away_team_id: game.away_team_id,
                home_score: game.home_score,
                away_score: game.away_score,
                stats_processed: false,
            },
        };
        t.games.insert(row.id, row.clone());
        if rescheduled {
            for pick in t.carry_picks(row.id, row.game_date) {
                warn!(
                    "Game {} moved to {}; dropped pick {} of group user {} (already picked that day)",
                    row.id, row.game_date, pick.id, pick.group_user_id
                );
            }
        }
        Ok(row)
    }

    async fn games_on(&self, date: NaiveDate) -> StoreResult<Vec<Game>> {
        let mut games: Vec<Game> = self
            .tables
            .lock()
            .games
            .values()
            .filter(|g| g.game_date == date)
            .cloned()
            .collect();
        // Matches `ORDER BY start_time NULLS LAST, external_id`
        games.sort_by(|a, b| {
            (a.start_time.is_none(), a.start_time, &a.external_id).cmp(&(
                b.start_time.is_none(),
                b.start_time,
                &b.external_id,
            ))
        });
        Ok(games)
    }

    async fn mark_stats_processed(&self, game_id: i64) -> StoreResult<()> {
        if let Some(game) = self.tables.lock().games.get_mut(&game_id) {
            game.stats_processed = true;
        }
        Ok(())
    }

    async fn live_game_dates(&self) -> StoreResult<Vec<NaiveDate>> {
        let mut dates: Vec<NaiveDate> = self
            .tables
            .lock()
            .games
            .values()
            .filter(|g| g.lifecycle() == GameStatus::InProgress)
            .map(|g| g.game_date)
            .collect();
        dates.sort();
        dates.dedup();
        Ok(dates)
    }

    async fn upsert_player_stats(&self, stats: &PlayerGameStats) -> StoreResult<()> {
        let mut t = self.tables.lock();
        let key = (stats.game_id, stats.player_id);
        let merged = match t.stats.get(&key) {
            Some(prev) => PlayerGameStats {
                game_id: stats.game_id,
                player_id: stats.player_id,
                points: stats.points.or(prev.points),
                rebounds: stats.rebounds.or(prev.rebounds),
                assists: stats.assists.or(prev.assists),
                steals: stats.steals.or(prev.steals),
                blocks: stats.blocks.or(prev.blocks),
                turnovers: stats.turnovers.or(prev.turnovers),
                minutes: stats.minutes.clone().or(prev.minutes.clone()),
            },
            None => stats.clone(),
        };
        t.stats.insert(key, merged);
        Ok(())
    }

    async fn player_stats(
        &self,
        game_id: i64,
        player_id: i64,
    ) -> StoreResult<Option<PlayerGameStats>> {
        Ok(self.tables.lock().stats.get(&(game_id, player_id)).cloned())
    }

    async fn stats_for_game(&self, game_id: i64) -> StoreResult<Vec<PlayerGameStats>> {
        let mut rows: Vec<PlayerGameStats> = self
            .tables
            .lock()
            .stats
            .values()
            .filter(|s| s.game_id == game_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.player_id);
        Ok(rows)
    }

    async fn group_user(&self, user_id: Uuid, group_id: Uuid) -> StoreResult<Option<GroupUser>> {
        Ok(self
            .tables
            .lock()
            .group_users
            .values()
            .find(|gu| gu.user_id == user_id && gu.group_id == group_id)
            .cloned())
    }

    async fn group_user_by_id(&self, id: i64) -> StoreResult<Option<GroupUser>> {
        Ok(self.tables.lock().group_users.get(&id).cloned())
    }

    async fn insert_group_user(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        is_admin: bool,
    ) -> StoreResult<GroupUser> {
        let mut t = self.tables.lock();
        if t
            .group_users
            .values()
            .any(|gu| gu.user_id == user_id && gu.group_id == group_id)
        {
            return Err(StoreError::conflict(constraints::GROUP_USERS_USER_GROUP));
        }

        let row = GroupUser {
            id: t.next_id(),
            user_id,
            group_id,
            is_admin,
            created_at: Utc::now(),
        };
        t.group_users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn group_users(&self, group_id: Uuid) -> StoreResult<Vec<GroupUser>> {
        let mut rows: Vec<GroupUser> = self
            .tables
            .lock()
            .group_users
            .values()
            .filter(|gu| gu.group_id == group_id)
            .cloned()
            .collect();
        rows.sort_by_key(|gu| gu.id);
        Ok(rows)
    }

    async fn submission_on_day(
        &self,
        group_user_id: i64,
        date: NaiveDate,
    ) -> StoreResult<Option<Submission>> {
        Ok(self
            .tables
            .lock()
            .submissions
            .values()
            .find(|s| s.group_user_id == group_user_id && s.game_date == date)
            .cloned())
    }

    async fn submission_for_player(
        &self,
        group_user_id: i64,
        player_id: i64,
    ) -> StoreResult<Option<Submission>> {
        Ok(self
            .tables
            .lock()
            .submissions
            .values()
            .find(|s| s.group_user_id == group_user_id && s.player_id == player_id)
            .cloned())
    }

    async fn insert_submission(&self, submission: &NewSubmission) -> StoreResult<Submission> {
        let mut t = self.tables.lock();
        t.check_submission_unique(None, submission)?;

        let row = Submission {
            id: t.next_id(),
            group_user_id: submission.group_user_id,
            game_id: submission.game_id,
            player_id: submission.player_id,
            game_date: submission.game_date,
            created_at: Utc::now(),
        };
        t.submissions.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_submission(
        &self,
        id: i64,
        submission: &NewSubmission,
    ) -> StoreResult<Submission> {
        let mut t = self.tables.lock();
        t.check_submission_unique(Some(id), submission)?;

        let row = t
            .submissions
            .get_mut(&id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        row.game_id = submission.game_id;
        row.player_id = submission.player_id;
        row.game_date = submission.game_date;
        Ok(row.clone())
    }

    async fn group_submissions(&self, group_id: Uuid) -> StoreResult<Vec<Submission>> {
        let t = self.tables.lock();
        let members = t.group_member_ids(group_id);
        let mut rows: Vec<Submission> = t
            .submissions
            .values()
            .filter(|s| members.contains(&s.group_user_id))
            .cloned()
            .collect();
        rows.sort_by_key(|s| (s.game_date, s.id));
        Ok(rows)
    }

    async fn group_submissions_on(
        &self,
        group_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<Submission>> {
        let t = self.tables.lock();
        let members = t.group_member_ids(group_id);
        let mut rows: Vec<Submission> = t
            .submissions
            .values()
            .filter(|s| members.contains(&s.group_user_id) && s.game_date == date)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.id);
        Ok(rows)
    }
}
