use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::game_mode::GameModeSummary, error::AppError, services::game_mode_service,
    state::SharedState,
};

/// Public game mode catalogue.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/game-modes", get(list_game_modes))
        .route("/game-modes/{id}", get(get_game_mode))
}

/// Every game mode, by name.
#[utoipa::path(
    get,
    path = "/game-modes",
    tag = "game-modes",
    responses((status = 200, description = "Game modes", body = [GameModeSummary]))
)]
pub async fn list_game_modes(
    State(state): State<SharedState>,
) -> Result<Json<Vec<GameModeSummary>>, AppError> {
    Ok(Json(game_mode_service::list_game_modes(&state).await?))
}

/// One game mode with its regions.
#[utoipa::path(
    get,
    path = "/game-modes/{id}",
    tag = "game-modes",
    params(("id" = String, Path, description = "Identifier of the game mode")),
    responses(
        (status = 200, description = "Game mode", body = GameModeSummary),
        (status = 404, description = "Unknown game mode")
    )
)]
pub async fn get_game_mode(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameModeSummary>, AppError> {
    Ok(Json(game_mode_service::get_game_mode(&state, id).await?))
}
