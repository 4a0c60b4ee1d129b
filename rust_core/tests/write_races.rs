//! Writes that lose a uniqueness race to a concurrent writer.
//!
//! `RacingStore` hides an existing row from the pre-write lookup, so each
//! operation reaches the storage constraint and has to recover from it.

mod common;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use common::racing::RacingStore;
use common::{celtics, date};
use parking_lot::Mutex;
use pickem_rust_core::db::{constraints, MemoryStore, Store};
use pickem_rust_core::error::{Error, Result};
use pickem_rust_core::models::{Game, GameFields, Player, PlayerFields, TeamFields};
use pickem_rust_core::reconcile::reconcile_team;
use pickem_rust_core::{Groups, Identity, InviteResolution, InviteTokens, PickEngine};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use uuid::Uuid;

const ALICE: Uuid = Uuid::from_u128(0xA);
const GROUP: Uuid = Uuid::from_u128(0x100);

fn racing() -> (Arc<RacingStore>, Arc<MemoryStore>) {
    let inner = Arc::new(MemoryStore::new());
    (Arc::new(RacingStore::new(inner.clone())), inner)
}

#[tokio::test]
async fn test_team_created_concurrently_is_reread() {
    let (store, inner) = racing();
    let winner = inner
        .insert_team(
            &TeamFields {
                external_id: Some("2".into()),
                name: "Boston Celtics".into(),
                abbreviation: Some("BOS".into()),
                logo_url: None,
            },
            false,
        )
        .await
        .unwrap();

    // Both lookups miss, as if the row landed right after them
    store.miss_team_lookups(2);
    let team = reconcile_team(store.as_ref(), &celtics()).await.unwrap();

    assert_eq!(team.id, winner.id);
    assert_eq!(store.conflicts(), vec![constraints::TEAMS_NAME.to_string()]);
    assert_eq!(inner.counts().teams, 1);
}

struct Session(Uuid);

impl Identity for Session {
    fn current_user_id(&self) -> Option<Uuid> {
        Some(self.0)
    }

    fn is_authenticated(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct Invites {
    tokens: Mutex<FxHashMap<String, Uuid>>,
}

#[async_trait]
impl InviteTokens for Invites {
    async fn mint(&self, group_id: Uuid) -> Result<String> {
        let token = format!("invite-{group_id}");
        self.tokens.lock().insert(token.clone(), group_id);
        Ok(token)
    }

    async fn resolve(&self, token: &str) -> Result<InviteResolution> {
        Ok(self
            .tokens
            .lock()
            .get(token)
            .copied()
            .map_or(InviteResolution::Invalid, InviteResolution::Group))
    }
}

#[tokio::test]
async fn test_double_join_returns_existing_membership() {
    let (store, inner) = racing();
    let groups = Groups::new(store.clone(), Arc::new(Invites::default()));
    let owner = groups.create_group(ALICE).await.unwrap();
    let token = groups.invite_link(ALICE, owner.group_id).await.unwrap();

    let friend = Session(Uuid::from_u128(0xB));
    let first = groups.join_with_invite(&friend, &token).await.unwrap();

    store.miss_membership_lookups(1);
    let second = groups.join_with_invite(&friend, &token).await.unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(
        store.conflicts(),
        vec![constraints::GROUP_USERS_USER_GROUP.to_string()]
    );
    assert_eq!(inner.counts().group_users, 2);
}

struct Slate {
    engine: PickEngine,
    store: Arc<RacingStore>,
    inner: Arc<MemoryStore>,
    now: DateTime<Utc>,
    /// Apr 30
    early: Game,
    /// Apr 30, later the same evening
    late: Game,
    /// May 2
    next: Game,
    tatum: Player,
    jokic: Player,
}

async fn slate() -> Slate {
    let (store, inner) = racing();
    let mut team_ids = Vec::new();
    for (ext, name) in [("2", "Boston Celtics"), ("18", "New York Knicks"), ("7", "Denver Nuggets")] {
        let team = inner
            .insert_team(
                &TeamFields {
                    external_id: Some(ext.into()),
                    name: name.into(),
                    ..Default::default()
                },
                false,
            )
            .await
            .unwrap();
        team_ids.push(team.id);
    }
    let (bos, ny, den) = (team_ids[0], team_ids[1], team_ids[2]);

    let game = |ext: &str, start: DateTime<Utc>, home: i64, away: i64| GameFields {
        external_id: ext.into(),
        game_date: start.with_timezone(&chrono_tz::America::New_York).date_naive(),
        start_time: Some(start),
        status: "STATUS_SCHEDULED".into(),
        home_team_id: home,
        away_team_id: away,
        home_score: None,
        away_score: None,
    };
    let early = inner
        .upsert_game(&game("401", Utc.with_ymd_and_hms(2025, 4, 30, 23, 0, 0).unwrap(), bos, ny))
        .await
        .unwrap();
    let late = inner
        .upsert_game(&game("402", Utc.with_ymd_and_hms(2025, 5, 1, 1, 30, 0).unwrap(), den, ny))
        .await
        .unwrap();
    let next = inner
        .upsert_game(&game("403", Utc.with_ymd_and_hms(2025, 5, 2, 23, 0, 0).unwrap(), ny, bos))
        .await
        .unwrap();

    let player = |ext: &str, name: &str, team_id: i64| PlayerFields {
        external_id: ext.into(),
        name: name.into(),
        team_id: Some(team_id),
        image_url: None,
    };
    let tatum = inner.upsert_player(&player("4065648", "Jayson Tatum", bos)).await.unwrap();
    let jokic = inner.upsert_player(&player("3112335", "Nikola Jokic", den)).await.unwrap();

    inner.insert_group_user(ALICE, GROUP, true).await.unwrap();

    Slate {
        engine: PickEngine::new(store.clone()),
        store,
        inner,
        now: Utc.with_ymd_and_hms(2025, 4, 30, 12, 0, 0).unwrap(),
        early,
        late,
        next,
        tatum,
        jokic,
    }
}

#[tokio::test]
async fn test_racing_second_pick_same_day_is_day_already_picked() {
    let s = slate().await;
    s.engine
        .submit_pick_at(ALICE, GROUP, s.early.id, s.tatum.id, s.now)
        .await
        .unwrap();

    // Both the per-player and the per-day checks see nothing
    s.store.miss_submission_lookups(2);
    let result = s
        .engine
        .submit_pick_at(ALICE, GROUP, s.late.id, s.jokic.id, s.now)
        .await;

    assert!(matches!(result, Err(Error::DayAlreadyPicked { date: d }) if d == date(2025, 4, 30)));
    assert_eq!(
        s.store.conflicts(),
        vec![constraints::SUBMISSIONS_GROUP_USER_DAY.to_string()]
    );
    assert_eq!(s.inner.counts().submissions, 1);
}

#[tokio::test]
async fn test_racing_reuse_of_player_is_player_already_used() {
    let s = slate().await;
    s.engine
        .submit_pick_at(ALICE, GROUP, s.early.id, s.tatum.id, s.now)
        .await
        .unwrap();

    s.store.miss_submission_lookups(2);
    let result = s
        .engine
        .submit_pick_at(ALICE, GROUP, s.next.id, s.tatum.id, s.now)
        .await;

    assert!(matches!(result, Err(Error::PlayerAlreadyUsed { player_id }) if player_id == s.tatum.id));
    assert_eq!(
        s.store.conflicts(),
        vec![constraints::SUBMISSIONS_GROUP_USER_PLAYER.to_string()]
    );
    assert_eq!(s.inner.counts().submissions, 1);
}
