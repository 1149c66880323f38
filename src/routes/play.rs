use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dao::models::PlayContext,
    dto::play::{
        DailyStatusResponse, GuessRequest, OtherGuessItem, RoundResultResponse,
        RoundStartResponse,
    },
    error::AppError,
    routes::identity::Identity,
    services::{
        play_service::{self, SubmissionOrigin},
        profile_service,
    },
    state::SharedState,
};

/// Free daily play and in-match rounds.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/play/daily/round", post(start_daily_round))
        .route("/play/daily/guess", post(submit_daily_guess))
        .route("/play/daily/status", get(daily_status))
        .route("/play/daily/rounds/{round}/others", get(other_guesses))
        .route("/matches/{id}/round", post(start_match_round))
        .route("/matches/{id}/guess", post(submit_match_guess))
}

/// Open the caller's next daily round and return its target and clock.
#[utoipa::path(
    post,
    path = "/play/daily/round",
    tag = "play",
    params(
        ("X-User-Id" = String, Header, description = "Identifier of the calling player"),
        ("X-User-Name" = Option<String>, Header, description = "Display name of the calling player")
    ),
    responses(
        (status = 200, description = "Round opened", body = RoundStartResponse),
        (status = 409, description = "Daily limit reached"),
        (status = 503, description = "No location could be generated or storage is down")
    )
)]
pub async fn start_daily_round(
    State(state): State<SharedState>,
    identity: Identity,
) -> Result<Json<RoundStartResponse>, AppError> {
    profile_service::remember(&state, identity.user_id, identity.username.as_deref()).await;
    let round = play_service::start_daily_round(&state, identity.user_id).await?;
    Ok(Json(round))
}

/// Score and record a daily round. Omit `guess` to record a timeout.
///
/// Without `day`, the round belongs to the caller's open round, or to the current game day.
#[utoipa::path(
    post,
    path = "/play/daily/guess",
    tag = "play",
    params(("X-User-Id" = String, Header, description = "Identifier of the calling player")),
    request_body = GuessRequest,
    responses(
        (status = 200, description = "Round scored", body = RoundResultResponse),
        (status = 400, description = "The round's game day is over"),
        (status = 409, description = "Round already played or played out of order")
    )
)]
pub async fn submit_daily_guess(
    State(state): State<SharedState>,
    identity: Identity,
    Valid(Json(payload)): Valid<Json<GuessRequest>>,
) -> Result<Json<RoundResultResponse>, AppError> {
    let day = payload.day.unwrap_or_else(|| {
        play_service::daily_submission_day(&state, identity.user_id, payload.round)
    });
    let result = play_service::submit_guess(
        &state,
        identity.user_id,
        PlayContext::Daily(day),
        payload.round,
        payload.guess,
        SubmissionOrigin::Player,
    )
    .await?;
    Ok(Json(result))
}

/// Rounds the caller played during the current game day.
#[utoipa::path(
    get,
    path = "/play/daily/status",
    tag = "play",
    params(("X-User-Id" = String, Header, description = "Identifier of the calling player")),
    responses((status = 200, description = "Daily progress", body = DailyStatusResponse))
)]
pub async fn daily_status(
    State(state): State<SharedState>,
    identity: Identity,
) -> Result<Json<DailyStatusResponse>, AppError> {
    Ok(Json(
        play_service::daily_status(&state, identity.user_id).await?,
    ))
}

/// Where other players guessed on a daily round the caller already played.
#[utoipa::path(
    get,
    path = "/play/daily/rounds/{round}/others",
    tag = "play",
    params(
        ("X-User-Id" = String, Header, description = "Identifier of the calling player"),
        ("round" = u8, Path, description = "Daily round number")
    ),
    responses(
        (status = 200, description = "Other players' guesses, best first", body = [OtherGuessItem]),
        (status = 409, description = "The caller has not played that round")
    )
)]
pub async fn other_guesses(
    State(state): State<SharedState>,
    identity: Identity,
    Path(round): Path<u8>,
) -> Result<Json<Vec<OtherGuessItem>>, AppError> {
    Ok(Json(
        play_service::other_guesses(&state, identity.user_id, round).await?,
    ))
}

/// Open the caller's next round of a championship match.
#[utoipa::path(
    post,
    path = "/matches/{id}/round",
    tag = "matches",
    params(
        ("X-User-Id" = String, Header, description = "Identifier of the calling player"),
        ("X-User-Name" = Option<String>, Header, description = "Display name of the calling player"),
        ("id" = String, Path, description = "Identifier of the match")
    ),
    responses(
        (status = 200, description = "Round opened", body = RoundStartResponse),
        (status = 401, description = "Caller does not play in this match"),
        (status = 409, description = "Every round was already played")
    )
)]
pub async fn start_match_round(
    State(state): State<SharedState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<RoundStartResponse>, AppError> {
    profile_service::remember(&state, identity.user_id, identity.username.as_deref()).await;
    let round = play_service::start_match_round(&state, identity.user_id, id).await?;
    Ok(Json(round))
}

/// Score and record a match round. The sixth round triggers match completion.
#[utoipa::path(
    post,
    path = "/matches/{id}/guess",
    tag = "matches",
    params(
        ("X-User-Id" = String, Header, description = "Identifier of the calling player"),
        ("id" = String, Path, description = "Identifier of the match")
    ),
    request_body = GuessRequest,
    responses(
        (status = 200, description = "Round scored", body = RoundResultResponse),
        (status = 409, description = "Round already played or played out of order")
    )
)]
pub async fn submit_match_guess(
    State(state): State<SharedState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<GuessRequest>>,
) -> Result<Json<RoundResultResponse>, AppError> {
    let result = play_service::submit_guess(
        &state,
        identity.user_id,
        PlayContext::Match(id),
        payload.round,
        payload.guess,
        SubmissionOrigin::Player,
    )
    .await?;
    Ok(Json(result))
}
