/// Championship creation, standings, metrics and deletion.
pub mod championship_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game mode catalogue management.
pub mod game_mode_service;
/// Health check service.
pub mod health_service;
/// Shared target resolution for daily and match rounds.
pub mod location_service;
/// Match completion, recaps and result overrides.
pub mod match_service;
/// Round lifecycle: start, submit, timeouts and daily status.
pub mod play_service;
/// Display names of players.
pub mod profile_service;
/// Free-play leaderboards.
pub mod ranking_service;
/// Storage connection supervision and degraded mode.
pub mod storage_supervisor;
