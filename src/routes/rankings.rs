use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::ranking::{RankingQuery, RankingResponse},
    error::AppError,
    services::ranking_service,
    state::SharedState,
};

/// Free-play leaderboards.
pub fn router() -> Router<SharedState> {
    Router::new().route("/rankings", get(ranking))
}

/// Leaderboard of daily play over a period (`daily` by default).
#[utoipa::path(
    get,
    path = "/rankings",
    tag = "rankings",
    params(RankingQuery),
    responses((status = 200, description = "Ranking", body = RankingResponse))
)]
pub async fn ranking(
    State(state): State<SharedState>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<RankingResponse>, AppError> {
    Ok(Json(ranking_service::ranking(&state, query.period).await?))
}
