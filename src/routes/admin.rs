use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        championship::{
            ChampionshipSummary, CreateChampionshipRequest, MatchSummary, OverrideResultRequest,
        },
        game_mode::{GameModeRequest, GameModeSummary},
    },
    error::AppError,
    routes::identity::Identity,
    services::{championship_service, game_mode_service, match_service},
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only management of championships, results and game modes.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/championships", post(create_championship))
        .route("/admin/championships/{id}", delete(delete_championship))
        .route("/admin/matches/{id}/result", put(override_result))
        .route("/admin/game-modes", post(create_game_mode))
        .route(
            "/admin/game-modes/{id}",
            put(update_game_mode).delete(delete_game_mode),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Create a championship and its whole round-robin fixture.
#[utoipa::path(
    post,
    path = "/admin/championships",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Configured admin token")),
    request_body = CreateChampionshipRequest,
    responses(
        (status = 200, description = "Championship created", body = ChampionshipSummary),
        (status = 400, description = "Fewer than two or duplicate participants")
    )
)]
pub async fn create_championship(
    State(state): State<SharedState>,
    identity: Option<Identity>,
    Valid(Json(payload)): Valid<Json<CreateChampionshipRequest>>,
) -> Result<Json<ChampionshipSummary>, AppError> {
    let created_by = identity.map_or_else(Uuid::nil, |identity| identity.user_id);
    Ok(Json(
        championship_service::create_championship(&state, created_by, payload).await?,
    ))
}

/// Delete a championship with its matches and their guesses.
#[utoipa::path(
    delete,
    path = "/admin/championships/{id}",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Configured admin token"),
    ("id" = String, Path, description = "Identifier of the championship to delete")),
    responses((status = 204, description = "Championship deleted"))
)]
pub async fn delete_championship(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    championship_service::delete_championship(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Force the result of a match, replacing any previous one.
#[utoipa::path(
    put,
    path = "/admin/matches/{id}/result",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Configured admin token"),
    ("id" = String, Path, description = "Identifier of the match")),
    request_body = OverrideResultRequest,
    responses((status = 200, description = "Result stored", body = MatchSummary))
)]
pub async fn override_result(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<OverrideResultRequest>>,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(
        match_service::override_result(
            &state,
            id,
            payload.player1_rounds_won,
            payload.player2_rounds_won,
        )
        .await?,
    ))
}

/// Create a game mode.
#[utoipa::path(
    post,
    path = "/admin/game-modes",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Configured admin token")),
    request_body = GameModeRequest,
    responses((status = 200, description = "Game mode created", body = GameModeSummary))
)]
pub async fn create_game_mode(
    State(state): State<SharedState>,
    identity: Option<Identity>,
    Valid(Json(payload)): Valid<Json<GameModeRequest>>,
) -> Result<Json<GameModeSummary>, AppError> {
    let created_by = identity.map_or_else(Uuid::nil, |identity| identity.user_id);
    Ok(Json(
        game_mode_service::create_game_mode(&state, created_by, payload).await?,
    ))
}

/// Replace the name, description and regions of a game mode.
#[utoipa::path(
    put,
    path = "/admin/game-modes/{id}",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Configured admin token"),
    ("id" = String, Path, description = "Identifier of the game mode")),
    request_body = GameModeRequest,
    responses((status = 200, description = "Game mode updated", body = GameModeSummary))
)]
pub async fn update_game_mode(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<GameModeRequest>>,
) -> Result<Json<GameModeSummary>, AppError> {
    Ok(Json(
        game_mode_service::update_game_mode(&state, id, payload).await?,
    ))
}

/// Delete a game mode no active championship uses.
#[utoipa::path(
    delete,
    path = "/admin/game-modes/{id}",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Configured admin token"),
    ("id" = String, Path, description = "Identifier of the game mode")),
    responses(
        (status = 204, description = "Game mode deleted"),
        (status = 409, description = "Game mode used by an active championship")
    )
)]
pub async fn delete_game_mode(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    game_mode_service::delete_game_mode(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Middleware rejecting requests whose admin token does not match the configured one.
async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    check_token(state.config().admin_token.as_deref(), provided)?;
    Ok(next.run(req).await)
}

fn check_token(expected: Option<&str>, provided: Option<&str>) -> Result<(), AppError> {
    let provided = provided.ok_or_else(|| {
        AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
    })?;
    match expected {
        Some(token) if token == provided => Ok(()),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized(
            "no admin token configured on this server".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_token_must_match_configuration() {
        assert!(check_token(Some("s3cret"), Some("s3cret")).is_ok());
        assert!(check_token(Some("s3cret"), Some("guess")).is_err());
        assert!(check_token(Some("s3cret"), None).is_err());
        assert!(check_token(None, Some("anything")).is_err());
    }
}
