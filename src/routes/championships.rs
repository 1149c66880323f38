use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::championship::{
        ChampionshipDetail, ChampionshipMetricsResponse, ChampionshipSummary, MatchSummary,
    },
    error::AppError,
    routes::identity::Identity,
    services::{championship_service, match_service},
    state::SharedState,
};

/// Read-only championship views.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/championships", get(list_championships))
        .route("/championships/{id}", get(championship_detail))
        .route("/championships/{id}/metrics", get(championship_metrics))
        .route("/me/matches", get(my_pending_matches))
}

/// Every championship, newest first.
#[utoipa::path(
    get,
    path = "/championships",
    tag = "championships",
    responses((status = 200, description = "Championships", body = [ChampionshipSummary]))
)]
pub async fn list_championships(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ChampionshipSummary>>, AppError> {
    Ok(Json(championship_service::list_championships(&state).await?))
}

/// Standings, current round and fixture of a championship.
#[utoipa::path(
    get,
    path = "/championships/{id}",
    tag = "championships",
    params(("id" = String, Path, description = "Identifier of the championship")),
    responses(
        (status = 200, description = "Championship detail", body = ChampionshipDetail),
        (status = 404, description = "Unknown championship")
    )
)]
pub async fn championship_detail(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChampionshipDetail>, AppError> {
    Ok(Json(
        championship_service::championship_detail(&state, id).await?,
    ))
}

/// Per-player and per-continent statistics of a championship.
#[utoipa::path(
    get,
    path = "/championships/{id}/metrics",
    tag = "championships",
    params(("id" = String, Path, description = "Identifier of the championship")),
    responses((status = 200, description = "Championship metrics", body = ChampionshipMetricsResponse))
)]
pub async fn championship_metrics(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChampionshipMetricsResponse>, AppError> {
    Ok(Json(
        championship_service::championship_metrics(&state, id).await?,
    ))
}

/// Matches the caller still has to play, across championships.
#[utoipa::path(
    get,
    path = "/me/matches",
    tag = "championships",
    params(("X-User-Id" = String, Header, description = "Identifier of the calling player")),
    responses((status = 200, description = "Pending matches", body = [MatchSummary]))
)]
pub async fn my_pending_matches(
    State(state): State<SharedState>,
    identity: Identity,
) -> Result<Json<Vec<MatchSummary>>, AppError> {
    Ok(Json(
        match_service::pending_matches(&state, identity.user_id).await?,
    ))
}
