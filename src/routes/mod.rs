use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

pub mod admin;
pub mod championships;
pub mod game_modes;
pub mod health;
pub mod identity;
pub mod matches;
pub mod play;
pub mod rankings;

/// Path of the generated OpenAPI document.
pub const OPENAPI_JSON_PATH: &str = "/api-doc/openapi.json";

/// Compose all route trees, wiring in shared state and the Swagger UI at `/docs`.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(play::router())
        .merge(championships::router())
        .merge(matches::router())
        .merge(game_modes::router())
        .merge(rankings::router())
        .merge(admin::router(state.clone()));

    api_router
        .merge(SwaggerUi::new("/docs").url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
        .with_state(state)
}
