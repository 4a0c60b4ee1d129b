//! Player upsert keyed by the provider's athlete id.

use crate::db::Store;
use crate::error::Result;
use crate::models::{Player, PlayerFields};
use crate::providers::ProviderPlayer;
use tracing::warn;

/// Upsert a feed athlete. Athletes without an id cannot be tracked and are
/// dropped.
pub async fn reconcile_player(
    store: &dyn Store,
    payload: &ProviderPlayer,
    team_id: Option<i64>,
) -> Result<Option<Player>> {
    let external_id = match payload.external_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            warn!("Dropping athlete {:?} without an external id", payload.name);
            return Ok(None);
        }
    };

    let player = store
        .upsert_player(&PlayerFields {
            external_id,
            name: payload.name.trim().to_string(),
            team_id,
            image_url: payload.image_url.clone(),
        })
        .await?;
    Ok(Some(player))
}
