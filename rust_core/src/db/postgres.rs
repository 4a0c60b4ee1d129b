//! PostgreSQL-backed `Store`.
//!
//! All feed-owned writes are `INSERT ... ON CONFLICT DO UPDATE` keyed by the
//! provider's stable identity, so repeated ingestion passes converge instead
//! of duplicating rows.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Store, StoreResult};
use crate::models::{
    Game, GameFields, GroupUser, NewSubmission, Player, PlayerFields, PlayerGameStats,
    Submission, Team, TeamFields,
};

const TEAM_COLUMNS: &str = "id, external_id, name, abbreviation, logo_url, is_placeholder";
const PLAYER_COLUMNS: &str = "id, external_id, name, team_id, image_url";
const GAME_COLUMNS: &str = "id, external_id, game_date, start_time, status, home_team_id, \
     away_team_id, home_score, away_score, stats_processed";
const STATS_COLUMNS: &str =
    "game_id, player_id, points, rebounds, assists, steals, blocks, turnovers, minutes";
const GROUP_USER_COLUMNS: &str = "id, user_id, group_id, is_admin, created_at";
const SUBMISSION_COLUMNS: &str = "id, group_user_id, game_id, player_id, game_date, created_at";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn team(&self, id: i64) -> StoreResult<Option<Team>> {
        let team = sqlx::query_as::<_, Team>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(team)
    }

    async fn team_by_external_id(&self, external_id: &str) -> StoreResult<Option<Team>> {
        let team = sqlx::query_as::<_, Team>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(team)
    }

    async fn team_by_name(&self, name: &str) -> StoreResult<Option<Team>> {
        let team = sqlx::query_as::<_, Team>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(team)
    }

    async fn placeholder_team(&self) -> StoreResult<Option<Team>> {
        let team = sqlx::query_as::<_, Team>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE is_placeholder"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(team)
    }

    async fn insert_team(&self, team: &TeamFields, is_placeholder: bool) -> StoreResult<Team> {
        let row = sqlx::query_as::<_, Team>(&format!(
            r#"
            INSERT INTO teams (external_id, name, abbreviation, logo_url, is_placeholder)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(&team.external_id)
        .bind(&team.name)
        .bind(&team.abbreviation)
        .bind(&team.logo_url)
        .bind(is_placeholder)
        .fetch_one(&self.pool)
        .await?;

        debug!("Inserted team {} ({:?})", row.name, row.external_id);
        Ok(row)
    }

    async fn update_team(&self, id: i64, team: &TeamFields) -> StoreResult<Team> {
        let row = sqlx::query_as::<_, Team>(&format!(
            r#"
            UPDATE teams SET
                name = $2,
                abbreviation = COALESCE($3, abbreviation),
                logo_url = COALESCE($4, logo_url),
                external_id = COALESCE(external_id, $5),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&team.name)
        .bind(&team.abbreviation)
        .bind(&team.logo_url)
        .bind(&team.external_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn player(&self, id: i64) -> StoreResult<Option<Player>> {
        let player = sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(player)
    }

    async fn player_by_external_id(&self, external_id: &str) -> StoreResult<Option<Player>> {
        let player = sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(player)
    }

    async fn upsert_player(&self, player: &PlayerFields) -> StoreResult<Player> {
        let row = sqlx::query_as::<_, Player>(&format!(
            r#"
            INSERT INTO players (external_id, name, team_id, image_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (external_id) DO UPDATE SET
                name = EXCLUDED.name,
                team_id = COALESCE(EXCLUDED.team_id, players.team_id),
                image_url = COALESCE(EXCLUDED.image_url, players.image_url),
                updated_at = NOW()
            RETURNING {PLAYER_COLUMNS}
            "#
        ))
        .bind(&player.external_id)
        .bind(&player.name)
        .bind(player.team_id)
        .bind(&player.image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn game(&self, id: i64) -> StoreResult<Option<Game>> {
        let game = sqlx::query_as::<_, Game>(&format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(game)
    }

    async fn game_by_external_id(&self, external_id: &str) -> StoreResult<Option<Game>> {
        let game = sqlx::query_as::<_, Game>(&format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(game)
    }

    async fn upsert_game(&self, game: &GameFields) -> StoreResult<Game> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, Game>(&format!(
            r#"
            INSERT INTO games (
                external_id, game_date, start_time, status,
                home_team_id, away_team_id, home_score, away_score
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (external_id) DO UPDATE SET
                game_date = EXCLUDED.game_date,
                start_time = EXCLUDED.start_time,
                status = EXCLUDED.status,
                home_team_id = EXCLUDED.home_team_id,
                away_team_id = EXCLUDED.away_team_id,
                home_score = COALESCE(EXCLUDED.home_score, games.home_score),
                away_score = COALESCE(EXCLUDED.away_score, games.away_score),
                updated_at = NOW()
            RETURNING {GAME_COLUMNS}
            "#
        ))
        .bind(&game.external_id)
        .bind(game.game_date)
        .bind(game.start_time)
        .bind(&game.status)
        .bind(game.home_team_id)
        .bind(game.away_team_id)
        .bind(game.home_score)
        .bind(game.away_score)
        .fetch_one(&mut *tx)
        .await?;

        // Picks follow a rescheduled game. A member who already picked on the
        // new date keeps that pick and loses the moved one.
        let dropped = sqlx::query_as::<_, Submission>(&format!(
            r#"
            DELETE FROM submissions s
            WHERE s.game_id = $1 AND s.game_date <> $2
              AND EXISTS (
                  SELECT 1 FROM submissions o
                  WHERE o.group_user_id = s.group_user_id
                    AND o.game_date = $2
                    AND o.id <> s.id
              )
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(row.id)
        .bind(row.game_date)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE submissions SET game_date = $2, updated_at = NOW()
            WHERE game_id = $1 AND game_date <> $2
            "#,
        )
        .bind(row.id)
        .bind(row.game_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        for pick in dropped {
            warn!(
                "Game {} moved to {}; dropped pick {} of group user {} (already picked that day)",
                row.id, row.game_date, pick.id, pick.group_user_id
            );
        }
        Ok(row)
    }

    async fn games_on(&self, date: NaiveDate) -> StoreResult<Vec<Game>> {
        let games = sqlx::query_as::<_, Game>(&format!(
            r#"
            SELECT {GAME_COLUMNS} FROM games
            WHERE game_date = $1
            ORDER BY start_time NULLS LAST, external_id
            "#
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(games)
    }

    async fn mark_stats_processed(&self, game_id: i64) -> StoreResult<()> {
        sqlx::query("UPDATE games SET stats_processed = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(game_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn live_game_dates(&self) -> StoreResult<Vec<NaiveDate>> {
        let dates = sqlx::query_scalar::<_, NaiveDate>(
            r#"
            SELECT DISTINCT game_date FROM games
            WHERE status ILIKE ANY (ARRAY['%in_progress%', '%halftime%', '%end_period%', '%end_of_period%'])
            ORDER BY game_date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(dates)
    }

    async fn upsert_player_stats(&self, stats: &PlayerGameStats) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO player_game_stats (
                game_id, player_id, points, rebounds, assists,
                steals, blocks, turnovers, minutes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (game_id, player_id) DO UPDATE SET
                points = COALESCE(EXCLUDED.points, player_game_stats.points),
                rebounds = COALESCE(EXCLUDED.rebounds, player_game_stats.rebounds),
                assists = COALESCE(EXCLUDED.assists, player_game_stats.assists),
                steals = COALESCE(EXCLUDED.steals, player_game_stats.steals),
                blocks = COALESCE(EXCLUDED.blocks, player_game_stats.blocks),
                turnovers = COALESCE(EXCLUDED.turnovers, player_game_stats.turnovers),
                minutes = COALESCE(EXCLUDED.minutes, player_game_stats.minutes),
                updated_at = NOW()
            "#,
        )
        .bind(stats.game_id)
        .bind(stats.player_id)
        .bind(stats.points)
        .bind(stats.rebounds)
        .bind(stats.assists)
        .bind(stats.steals)
        .bind(stats.blocks)
        .bind(stats.turnovers)
        .bind(&stats.minutes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn player_stats(
        &self,
        game_id: i64,
        player_id: i64,
    ) -> StoreResult<Option<PlayerGameStats>> {
        let stats = sqlx::query_as::<_, PlayerGameStats>(&format!(
            "SELECT {STATS_COLUMNS} FROM player_game_stats WHERE game_id = $1 AND player_id = $2"
        ))
        .bind(game_id)
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn stats_for_game(&self, game_id: i64) -> StoreResult<Vec<PlayerGameStats>> {
        let stats = sqlx::query_as::<_, PlayerGameStats>(&format!(
            "SELECT {STATS_COLUMNS} FROM player_game_stats WHERE game_id = $1 ORDER BY player_id"
        ))
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn group_user(&self, user_id: Uuid, group_id: Uuid) -> StoreResult<Option<GroupUser>> {
        let gu = sqlx::query_as::<_, GroupUser>(&format!(
            "SELECT {GROUP_USER_COLUMNS} FROM group_users WHERE user_id = $1 AND group_id = $2"
        ))
        .bind(user_id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(gu)
    }

    async fn group_user_by_id(&self, id: i64) -> StoreResult<Option<GroupUser>> {
        let gu = sqlx::query_as::<_, GroupUser>(&format!(
            "SELECT {GROUP_USER_COLUMNS} FROM group_users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(gu)
    }

    async fn insert_group_user(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        is_admin: bool,
    ) -> StoreResult<GroupUser> {
        let gu = sqlx::query_as::<_, GroupUser>(&format!(
            r#"
            INSERT INTO group_users (user_id, group_id, is_admin)
            VALUES ($1, $2, $3)
            RETURNING {GROUP_USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(group_id)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await?;
        Ok(gu)
    }

    async fn group_users(&self, group_id: Uuid) -> StoreResult<Vec<GroupUser>> {
        let rows = sqlx::query_as::<_, GroupUser>(&format!(
            "SELECT {GROUP_USER_COLUMNS} FROM group_users WHERE group_id = $1 ORDER BY id"
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn submission_on_day(
        &self,
        group_user_id: i64,
        date: NaiveDate,
    ) -> StoreResult<Option<Submission>> {
        let row = sqlx::query_as::<_, Submission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE group_user_id = $1 AND game_date = $2"
        ))
        .bind(group_user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn submission_for_player(
        &self,
        group_user_id: i64,
        player_id: i64,
    ) -> StoreResult<Option<Submission>> {
        let row = sqlx::query_as::<_, Submission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE group_user_id = $1 AND player_id = $2"
        ))
        .bind(group_user_id)
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_submission(&self, submission: &NewSubmission) -> StoreResult<Submission> {
        let row = sqlx::query_as::<_, Submission>(&format!(
            r#"
            INSERT INTO submissions (group_user_id, game_id, player_id, game_date)
            VALUES ($1, $2, $3, $4)
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(submission.group_user_id)
        .bind(submission.game_id)
        .bind(submission.player_id)
        .bind(submission.game_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_submission(
        &self,
        id: i64,
        submission: &NewSubmission,
    ) -> StoreResult<Submission> {
        let row = sqlx::query_as::<_, Submission>(&format!(
            r#"
            UPDATE submissions SET
                game_id = $2,
                player_id = $3,
                game_date = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(submission.game_id)
        .bind(submission.player_id)
        .bind(submission.game_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn group_submissions(&self, group_id: Uuid) -> StoreResult<Vec<Submission>> {
        let rows = sqlx::query_as::<_, Submission>(
            r#"
            SELECT s.id, s.group_user_id, s.game_id, s.player_id, s.game_date, s.created_at
            FROM submissions s
            JOIN group_users gu ON gu.id = s.group_user_id
            WHERE gu.group_id = $1
            ORDER BY s.game_date, s.id
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn group_submissions_on(
        &self,
        group_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<Submission>> {
        let rows = sqlx::query_as::<_, Submission>(
            r#"
            SELECT s.id, s.group_user_id, s.game_id, s.player_id, s.game_date, s.created_at
            FROM submissions s
            JOIN group_users gu ON gu.id = s.group_user_id
            WHERE gu.group_id = $1 AND s.game_date = $2
            ORDER BY s.id
            "#,
        )
        .bind(group_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
