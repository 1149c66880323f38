use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::championship::{CompletionResponse, MatchRecapResponse},
    error::AppError,
    routes::identity::Identity,
    services::match_service,
    state::SharedState,
};

/// Match recaps and completion retries.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/matches/{id}/recap", get(match_recap))
        .route("/matches/{id}/complete", post(complete_match))
}

/// Match result with the rounds visible to the caller.
#[utoipa::path(
    get,
    path = "/matches/{id}/recap",
    tag = "matches",
    params(
        ("X-User-Id" = Option<String>, Header, description = "Identifier of the calling player"),
        ("id" = String, Path, description = "Identifier of the match")
    ),
    responses(
        (status = 200, description = "Match recap", body = MatchRecapResponse),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn match_recap(
    State(state): State<SharedState>,
    identity: Option<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchRecapResponse>, AppError> {
    let viewer = identity.map(|identity| identity.user_id);
    Ok(Json(match_service::recap(&state, id, viewer).await?))
}

/// Evaluate completion of a match. Repeated calls never award points twice.
#[utoipa::path(
    post,
    path = "/matches/{id}/complete",
    tag = "matches",
    params(("id" = String, Path, description = "Identifier of the match")),
    responses(
        (status = 200, description = "Completion outcome", body = CompletionResponse),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn complete_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompletionResponse>, AppError> {
    Ok(Json(match_service::complete(&state, id).await?))
}
