//! Group membership through the identity and invite collaborators.
//!
//! Sessions and invite tokens live outside this crate; they are consumed
//! through the `Identity` and `InviteTokens` traits.

use crate::db::{Store, StoreError};
use crate::error::{Error, Result};
use crate::models::GroupUser;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// The caller's session.
pub trait Identity: Send + Sync {
    fn current_user_id(&self) -> Option<Uuid>;
    fn is_authenticated(&self) -> bool;
}

/// What an invite token resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteResolution {
    Group(Uuid),
    Expired,
    Invalid,
}

/// Issues and resolves bearer invite tokens.
#[async_trait]
pub trait InviteTokens: Send + Sync {
    async fn mint(&self, group_id: Uuid) -> Result<String>;
    async fn resolve(&self, token: &str) -> Result<InviteResolution>;
}

pub struct Groups {
    store: Arc<dyn Store>,
    invites: Arc<dyn InviteTokens>,
}

impl Groups {
    pub fn new(store: Arc<dyn Store>, invites: Arc<dyn InviteTokens>) -> Self {
        Self { store, invites }
    }

    /// New group owned (and administered) by `owner`.
    pub async fn create_group(&self, owner: Uuid) -> Result<GroupUser> {
        let group_id = Uuid::new_v4();
        let membership = self.store.insert_group_user(owner, group_id, true).await?;
        info!("User {} created group {}", owner, group_id);
        Ok(membership)
    }

    /// Mint an invite token. Only members may invite.
    pub async fn invite_link(&self, requester: Uuid, group_id: Uuid) -> Result<String> {
        if self.store.group_user(requester, group_id).await?.is_none() {
            return Err(Error::not_found(format!(
                "membership of {requester} in {group_id}"
            )));
        }
        self.invites.mint(group_id).await
    }

    /// Join the group a token points at. Joining twice returns the existing
    /// membership.
    pub async fn join_with_invite(&self, identity: &dyn Identity, token: &str) -> Result<GroupUser> {
        let user_id = match identity.current_user_id() {
            Some(id) if identity.is_authenticated() => id,
            _ => return Err(Error::Unauthenticated),
        };

        let group_id = match self.invites.resolve(token).await? {
            InviteResolution::Group(id) => id,
            InviteResolution::Expired => return Err(Error::InviteExpired),
            InviteResolution::Invalid => return Err(Error::InviteInvalid),
        };

        if let Some(existing) = self.store.group_user(user_id, group_id).await? {
            debug!("User {} already in group {}", user_id, group_id);
            return Ok(existing);
        }

        match self.store.insert_group_user(user_id, group_id, false).await {
            Ok(membership) => {
                info!("User {} joined group {}", user_id, group_id);
                Ok(membership)
            }
            Err(StoreError::Conflict { .. }) => self
                .store
                .group_user(user_id, group_id)
                .await?
                .ok_or_else(|| Error::not_found(format!("membership of {user_id} in {group_id}"))),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use parking_lot::Mutex;
    use rustc_hash::FxHashMap;

    struct Session(Option<Uuid>);

    impl Identity for Session {
        fn current_user_id(&self) -> Option<Uuid> {
            self.0
        }

        fn is_authenticated(&self) -> bool {
            self.0.is_some()
        }
    }

    #[derive(Default)]
    struct FakeInvites {
        tokens: Mutex<FxHashMap<String, Uuid>>,
    }

    #[async_trait]
    impl InviteTokens for FakeInvites {
        async fn mint(&self, group_id: Uuid) -> Result<String> {
            let token = format!("tok-{group_id}");
            self.tokens.lock().insert(token.clone(), group_id);
            Ok(token)
        }

        async fn resolve(&self, token: &str) -> Result<InviteResolution> {
            if token == "stale" {
                return Ok(InviteResolution::Expired);
            }
            Ok(self
                .tokens
                .lock()
                .get(token)
                .copied()
                .map_or(InviteResolution::Invalid, InviteResolution::Group))
        }
    }

    fn groups() -> (Groups, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (
            Groups::new(store.clone(), Arc::new(FakeInvites::default())),
            store,
        )
    }

    #[tokio::test]
    async fn test_create_and_join() {
        let (groups, store) = groups();
        let owner = Uuid::new_v4();
        let admin = groups.create_group(owner).await.unwrap();
        assert!(admin.is_admin);

        let token = groups.invite_link(owner, admin.group_id).await.unwrap();
        let friend = Uuid::new_v4();
        let joined = groups
            .join_with_invite(&Session(Some(friend)), &token)
            .await
            .unwrap();
        assert_eq!(joined.group_id, admin.group_id);
        assert!(!joined.is_admin);

        let again = groups
            .join_with_invite(&Session(Some(friend)), &token)
            .await
            .unwrap();
        assert_eq!(again.id, joined.id);
        assert_eq!(store.counts().group_users, 2);
    }

    #[tokio::test]
    async fn test_join_rejections() {
        let (groups, _) = groups();
        let owner = Uuid::new_v4();
        let admin = groups.create_group(owner).await.unwrap();
        let token = groups.invite_link(owner, admin.group_id).await.unwrap();

        assert!(matches!(
            groups.join_with_invite(&Session(None), &token).await,
            Err(Error::Unauthenticated)
        ));
        let user = Session(Some(Uuid::new_v4()));
        assert!(matches!(
            groups.join_with_invite(&user, "stale").await,
            Err(Error::InviteExpired)
        ));
        assert!(matches!(
            groups.join_with_invite(&user, "garbage").await,
            Err(Error::InviteInvalid)
        ));
    }

    #[tokio::test]
    async fn test_non_member_cannot_invite() {
        let (groups, _) = groups();
        let admin = groups.create_group(Uuid::new_v4()).await.unwrap();
        assert!(matches!(
            groups.invite_link(Uuid::new_v4(), admin.group_id).await,
            Err(Error::NotFound(_))
        ));
    }
}
