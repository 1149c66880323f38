//! DTOs for free-play rankings.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Time window a ranking covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RankingPeriod {
    /// Since the start of the current game day.
    #[default]
    Daily,
    /// The last seven days.
    Weekly,
    /// The last calendar month.
    Monthly,
    AllTime,
    /// Mean round score of players with enough rounds.
    Average,
}

/// Query string of the ranking route.
#[derive(Debug, Deserialize, IntoParams)]
pub struct RankingQuery {
    #[serde(default)]
    pub period: RankingPeriod,
}

/// One ranking line.
#[derive(Debug, Serialize, ToSchema)]
pub struct RankingEntry {
    pub position: usize,
    pub user_id: Uuid,
    pub username: String,
    /// Total score, or mean round score for the average ranking.
    pub score: f64,
    pub rounds_played: usize,
}

/// Ranking for one period.
#[derive(Debug, Serialize, ToSchema)]
pub struct RankingResponse {
    pub period: RankingPeriod,
    pub entries: Vec<RankingEntry>,
}
