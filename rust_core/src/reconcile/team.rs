//! Team identity reconciliation.
//!
//! A feed team is matched against stored teams by an ordered list of lookups
//! (external id, then display name). Misses fall through to creation, and a
//! creation that loses a uniqueness race re-reads the winner.

use crate::db::{Store, StoreError};
use crate::error::{Error, Result};
use crate::models::{Team, TeamFields, PLACEHOLDER_TEAM_NAME};
use crate::providers::ProviderTeam;
use tracing::{debug, info, warn};

/// One way of finding an existing team for a feed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamLookup {
    ByExternalId,
    ByName,
}

/// Lookups in priority order. The first hit wins.
pub const TEAM_LOOKUPS: [TeamLookup; 2] = [TeamLookup::ByExternalId, TeamLookup::ByName];

impl TeamLookup {
    pub async fn find(&self, store: &dyn Store, fields: &TeamFields) -> Result<Option<Team>> {
        let found = match self {
            TeamLookup::ByExternalId => match fields.external_id.as_deref() {
                Some(ext) => store.team_by_external_id(ext).await?,
                None => None,
            },
            TeamLookup::ByName => store.team_by_name(&fields.name).await?,
        };
        Ok(found)
    }
}

impl From<&ProviderTeam> for TeamFields {
    fn from(team: &ProviderTeam) -> Self {
        TeamFields {
            external_id: team
                .external_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            name: team.name.trim().to_string(),
            abbreviation: team.abbreviation.clone(),
            logo_url: team.logo_url.clone(),
        }
    }
}

pub async fn reconcile_team(store: &dyn Store, payload: &ProviderTeam) -> Result<Team> {
    if payload.is_placeholder() {
        return placeholder_team(store).await;
    }

    let fields = TeamFields::from(payload);
    for lookup in TEAM_LOOKUPS {
        if let Some(found) = lookup.find(store, &fields).await? {
            debug!("Team {:?} matched {:?} -> id {}", fields.name, lookup, found.id);
            return refresh_team(store, found, &fields).await;
        }
    }

    match store.insert_team(&fields, false).await {
        Ok(team) => {
            info!("Created team {} ({})", team.name, team.id);
            Ok(team)
        }
        Err(StoreError::Conflict { constraint }) => {
            debug!("Team insert for {:?} hit {}; re-reading", fields.name, constraint);
            read_after_conflict(store, &fields).await
        }
        Err(e) => Err(e.into()),
    }
}

/// The singleton "opponent not yet determined" team, created on first use.
pub async fn placeholder_team(store: &dyn Store) -> Result<Team> {
    if let Some(team) = store.placeholder_team().await? {
        return Ok(team);
    }

    let fields = TeamFields {
        name: PLACEHOLDER_TEAM_NAME.to_string(),
        ..Default::default()
    };
    match store.insert_team(&fields, true).await {
        Ok(team) => {
            info!("Created placeholder team ({})", team.id);
            Ok(team)
        }
        Err(StoreError::Conflict { .. }) => store
            .placeholder_team()
            .await?
            .ok_or_else(|| Error::not_found("placeholder team after conflict")),
        Err(e) => Err(e.into()),
    }
}

async fn refresh_team(store: &dyn Store, found: Team, fields: &TeamFields) -> Result<Team> {
    let unchanged = found.name == fields.name
        && (fields.abbreviation.is_none() || found.abbreviation == fields.abbreviation)
        && (fields.logo_url.is_none() || found.logo_url == fields.logo_url)
        && (fields.external_id.is_none() || found.external_id.is_some());
    if unchanged {
        return Ok(found);
    }

    match store.update_team(found.id, fields).await {
        Ok(team) => Ok(team),
        Err(StoreError::Conflict { constraint }) => {
            warn!(
                "Updating team {} to {:?} conflicts on {}; keeping stored row",
                found.id, fields.name, constraint
            );
            Ok(found)
        }
        Err(e) => Err(e.into()),
    }
}

async fn read_after_conflict(store: &dyn Store, fields: &TeamFields) -> Result<Team> {
    for lookup in TEAM_LOOKUPS {
        if let Some(team) = lookup.find(store, fields).await? {
            return Ok(team);
        }
    }
    Err(Error::not_found(format!(
        "team {:?} after insert conflict",
        fields.name
    )))
}
