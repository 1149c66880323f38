use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Guessr Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::play::start_daily_round,
        crate::routes::play::submit_daily_guess,
        crate::routes::play::daily_status,
        crate::routes::play::other_guesses,
        crate::routes::play::start_match_round,
        crate::routes::play::submit_match_guess,
        crate::routes::championships::list_championships,
        crate::routes::championships::championship_detail,
        crate::routes::championships::championship_metrics,
        crate::routes::championships::my_pending_matches,
        crate::routes::matches::match_recap,
        crate::routes::matches::complete_match,
        crate::routes::game_modes::list_game_modes,
        crate::routes::game_modes::get_game_mode,
        crate::routes::rankings::ranking,
        crate::routes::admin::create_championship,
        crate::routes::admin::delete_championship,
        crate::routes::admin::override_result,
        crate::routes::admin::create_game_mode,
        crate::routes::admin::update_game_mode,
        crate::routes::admin::delete_game_mode,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::geo::Coordinate,
            crate::geo::Region,
            crate::geo::Continent,
            crate::scoring::ScoringMode,
            crate::scoring::RoundScore,
            crate::dto::play::RoundStartResponse,
            crate::dto::play::GuessRequest,
            crate::dto::play::RoundResultResponse,
            crate::dto::play::PlayedRound,
            crate::dto::play::DailyStatusResponse,
            crate::dto::play::OtherGuessItem,
            crate::dto::championship::CreateChampionshipRequest,
            crate::dto::championship::OverrideResultRequest,
            crate::dto::championship::ChampionshipStatusDto,
            crate::dto::championship::MatchStatusDto,
            crate::dto::championship::ChampionshipSummary,
            crate::dto::championship::MatchSummary,
            crate::dto::championship::StandingItem,
            crate::dto::championship::ChampionshipDetail,
            crate::dto::championship::PlayerMetricsItem,
            crate::dto::championship::ContinentPlayerItem,
            crate::dto::championship::ContinentItem,
            crate::dto::championship::ChampionshipMetricsResponse,
            crate::dto::championship::RecapRound,
            crate::dto::championship::MatchRecapResponse,
            crate::dto::championship::CompletionKind,
            crate::dto::championship::CompletionResponse,
            crate::dto::game_mode::RegionInput,
            crate::dto::game_mode::GameModeRequest,
            crate::dto::game_mode::GameModeSummary,
            crate::dto::ranking::RankingPeriod,
            crate::dto::ranking::RankingEntry,
            crate::dto::ranking::RankingResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "play", description = "Free daily play"),
        (name = "championships", description = "Round-robin championships"),
        (name = "matches", description = "Championship matches"),
        (name = "game-modes", description = "Region-restricted game modes"),
        (name = "rankings", description = "Free-play leaderboards"),
        (name = "admin", description = "Administration, guarded by X-Admin-Token"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/play/daily/round",
            "/matches/{id}/complete",
            "/rankings",
            "/admin/game-modes/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
