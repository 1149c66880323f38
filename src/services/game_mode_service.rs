//! Custom game modes: named sets of circular regions restricting target sampling.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{ChampionshipStatus, GameModeEntity},
    dto::game_mode::{GameModeRequest, GameModeSummary},
    error::ServiceError,
    geo::Region,
    state::SharedState,
};

pub async fn list_game_modes(state: &SharedState) -> Result<Vec<GameModeSummary>, ServiceError> {
    let store = state.require_arena_store().await?;
    let mut modes = store.list_game_modes().await?;
    modes.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(modes.iter().map(GameModeSummary::from).collect())
}

pub async fn get_game_mode(state: &SharedState, id: Uuid) -> Result<GameModeSummary, ServiceError> {
    let store = state.require_arena_store().await?;
    let mode = store.find_game_mode(id).await?.ok_or_else(|| not_found(id))?;
    Ok(GameModeSummary::from(&mode))
}

pub async fn create_game_mode(
    state: &SharedState,
    created_by: Uuid,
    request: GameModeRequest,
) -> Result<GameModeSummary, ServiceError> {
    let (name, description, regions) = sanitize(request)?;
    let mode = GameModeEntity {
        id: Uuid::new_v4(),
        name,
        description,
        created_by,
        created_at: SystemTime::now(),
        regions,
    };

    let store = state.require_arena_store().await?;
    store.save_game_mode(mode.clone()).await?;
    info!(game_mode_id = %mode.id, regions = mode.regions.len(), "game mode created");
    Ok(GameModeSummary::from(&mode))
}

/// Replace name, description and regions. Matches already in progress keep the regions they
/// started with.
pub async fn update_game_mode(
    state: &SharedState,
    id: Uuid,
    request: GameModeRequest,
) -> Result<GameModeSummary, ServiceError> {
    let (name, description, regions) = sanitize(request)?;
    let store = state.require_arena_store().await?;
    let mut mode = store.find_game_mode(id).await?.ok_or_else(|| not_found(id))?;
    mode.name = name;
    mode.description = description;
    mode.regions = regions;

    store.save_game_mode(mode.clone()).await?;
    info!(game_mode_id = %id, regions = mode.regions.len(), "game mode updated");
    Ok(GameModeSummary::from(&mode))
}

/// Delete a game mode that no active championship uses.
pub async fn delete_game_mode(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_arena_store().await?;
    let in_use = store
        .list_championships()
        .await?
        .iter()
        .any(|c| c.game_mode_id == Some(id) && c.status == ChampionshipStatus::Active);
    if in_use {
        return Err(ServiceError::InvalidState(format!(
            "game mode `{id}` is used by an active championship"
        )));
    }

    if !store.delete_game_mode(id).await? {
        return Err(not_found(id));
    }
    info!(game_mode_id = %id, "game mode deleted");
    Ok(())
}

fn sanitize(
    request: GameModeRequest,
) -> Result<(String, Option<String>, Vec<Region>), ServiceError> {
    let name = request.name.trim().to_owned();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("game mode name is empty".into()));
    }
    let description = request
        .description
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty());

    let regions: Vec<Region> = request.regions.into_iter().map(Region::from).collect();
    if let Some(bad) = regions
        .iter()
        .find(|region| {
            !region.center.is_valid() || !region.radius_m.is_finite() || region.radius_m <= 0.0
        })
    {
        return Err(ServiceError::InvalidInput(format!(
            "invalid region at ({}, {}) with radius {} m",
            bad.center.lat, bad.center.lng, bad.radius_m
        )));
    }
    Ok((name, description, regions))
}

fn not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("game mode `{id}` not found"))
}
