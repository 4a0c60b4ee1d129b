//! A `Store` whose existence checks can be told to miss, so the following
//! insert lands on the storage constraint the way a concurrent writer would.

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use pickem_rust_core::db::{MemoryStore, Store, StoreError, StoreResult};
use pickem_rust_core::models::{
    Game, GameFields, GroupUser, NewSubmission, Player, PlayerFields, PlayerGameStats,
    Submission, Team, TeamFields,
};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Misses {
    teams: u32,
    memberships: u32,
    submissions: u32,
}

pub struct RacingStore {
    inner: Arc<MemoryStore>,
    misses: Mutex<Misses>,
    conflicts: Mutex<Vec<String>>,
}

impl RacingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            misses: Mutex::new(Misses::default()),
            conflicts: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// The next `n` team lookups (by external id or name) report nothing.
    pub fn miss_team_lookups(&self, n: u32) {
        self.misses.lock().teams = n;
    }

    /// The next `n` membership lookups report nothing.
    pub fn miss_membership_lookups(&self, n: u32) {
        self.misses.lock().memberships = n;
    }

    /// The next `n` per-day / per-player submission lookups report nothing.
    pub fn miss_submission_lookups(&self, n: u32) {
        self.misses.lock().submissions = n;
    }

    /// Constraint names of every conflict an insert ran into.
    pub fn conflicts(&self) -> Vec<String> {
        self.conflicts.lock().clone()
    }

    fn take(counter: &mut u32) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }

    fn missed(&self, pick: impl FnOnce(&mut Misses) -> &mut u32) -> bool {
        let mut misses = self.misses.lock();
        Self::take(pick(&mut *misses))
    }

    fn record<T>(&self, result: StoreResult<T>) -> StoreResult<T> {
        if let Err(StoreError::Conflict { constraint }) = &result {
            self.conflicts.lock().push(constraint.clone());
        }
        result
    }
}

#[async_trait]
impl Store for RacingStore {
    async fn team(&self, id: i64) -> StoreResult<Option<Team>> {
        self.inner.team(id).await
    }

    async fn team_by_external_id(&self, external_id: &str) -> StoreResult<Option<Team>> {
        if self.missed(|m| &mut m.teams) {
            return Ok(None);
        }
        self.inner.team_by_external_id(external_id).await
    }

    async fn team_by_name(&self, name: &str) -> StoreResult<Option<Team>> {
        if self.missed(|m| &mut m.teams) {
            return Ok(None);
        }
        self.inner.team_by_name(name).await
    }

    async fn placeholder_team(&self) -> StoreResult<Option<Team>> {
        self.inner.placeholder_team().await
    }

    async fn insert_team(&self, team: &TeamFields, is_placeholder: bool) -> StoreResult<Team> {
        self.record(self.inner.insert_team(team, is_placeholder).await)
    }

    async fn update_team(&self, id: i64, team: &TeamFields) -> StoreResult<Team> {
        self.record(self.inner.update_team(id, team).await)
    }

    async fn player(&self, id: i64) -> StoreResult<Option<Player>> {
        self.inner.player(id).await
    }

    async fn player_by_external_id(&self, external_id: &str) -> StoreResult<Option<Player>> {
        self.inner.player_by_external_id(external_id).await
    }

    async fn upsert_player(&self, player: &PlayerFields) -> StoreResult<Player> {
        self.inner.upsert_player(player).await
    }

    async fn game(&self, id: i64) -> StoreResult<Option<Game>> {
        self.inner.game(id).await
    }

    async fn game_by_external_id(&self, external_id: &str) -> StoreResult<Option<Game>> {
        self.inner.game_by_external_id(external_id).await
    }

    async fn upsert_game(&self, game: &GameFields) -> StoreResult<Game> {
        self.inner.upsert_game(game).await
    }

    async fn games_on(&self, date: NaiveDate) -> StoreResult<Vec<Game>> {
        self.inner.games_on(date).await
    }

    async fn mark_stats_processed(&self, game_id: i64) -> StoreResult<()> {
        self.inner.mark_stats_processed(game_id).await
    }

    async fn live_game_dates(&self) -> StoreResult<Vec<NaiveDate>> {
        self.inner.live_game_dates().await
    }

    async fn upsert_player_stats(&self, stats: &PlayerGameStats) -> StoreResult<()> {
        self.inner.upsert_player_stats(stats).await
    }

    async fn player_stats(
        &self,
        game_id: i64,
        player_id: i64,
    ) -> StoreResult<Option<PlayerGameStats>> {
        self.inner.player_stats(game_id, player_id).await
    }

    async fn stats_for_game(&self, game_id: i64) -> StoreResult<Vec<PlayerGameStats>> {
        self.inner.stats_for_game(game_id).await
    }

    async fn group_user(&self, user_id: Uuid, group_id: Uuid) -> StoreResult<Option<GroupUser>> {
        if self.missed(|m| &mut m.memberships) {
            return Ok(None);
        }
        self.inner.group_user(user_id, group_id).await
    }

    async fn group_user_by_id(&self, id: i64) -> StoreResult<Option<GroupUser>> {
        self.inner.group_user_by_id(id).await
    }

    async fn insert_group_user(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        is_admin: bool,
    ) -> StoreResult<GroupUser> {
        self.record(self.inner.insert_group_user(user_id, group_id, is_admin).await)
    }

    async fn group_users(&self, group_id: Uuid) -> StoreResult<Vec<GroupUser>> {
        self.inner.group_users(group_id).await
    }

    async fn submission_on_day(
        &self,
        group_user_id: i64,
        date: NaiveDate,
    ) -> StoreResult<Option<Submission>> {
        if self.missed(|m| &mut m.submissions) {
            return Ok(None);
        }
        self.inner.submission_on_day(group_user_id, date).await
    }

    async fn submission_for_player(
        &self,
        group_user_id: i64,
        player_id: i64,
    ) -> StoreResult<Option<Submission>> {
        if self.missed(|m| &mut m.submissions) {
            return Ok(None);
        }
        self.inner.submission_for_player(group_user_id, player_id).await
    }

    async fn insert_submission(&self, submission: &NewSubmission) -> StoreResult<Submission> {
        self.record(self.inner.insert_submission(submission).await)
    }

    async fn update_submission(
        &self,
        id: i64,
        submission: &NewSubmission,
    ) -> StoreResult<Submission> {
        self.record(self.inner.update_submission(id, submission).await)
    }

    async fn group_submissions(&self, group_id: Uuid) -> StoreResult<Vec<Submission>> {
        self.inner.group_submissions(group_id).await
    }

    async fn group_submissions_on(
        &self,
        group_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<Submission>> {
        self.inner.group_submissions_on(group_id, date).await
    }
}
