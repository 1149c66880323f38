//! DTOs for championships, standings, matches and their statistics.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dao::models::{ChampionshipEntity, ChampionshipStatus, MatchEntity, MatchStatus},
    dto::{format_system_time, play::PlayedRound},
    geo::{Continent, Coordinate},
    state::match_progress::ROUNDS_PER_MATCH,
    tournament::{
        metrics::{ContinentPerformance, PlayerMetrics},
        standings::StandingRow,
    },
};

/// Name shown for users without a cached profile.
pub const UNKNOWN_USERNAME: &str = "Unknown";

/// Payload creating a championship and its whole fixture.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateChampionshipRequest {
    #[validate(length(min = 1, max = 120, message = "name must be 1 to 120 characters"))]
    pub name: String,
    /// Roster in seating order; at least two distinct users.
    #[validate(length(min = 2, message = "a championship needs at least two participants"))]
    pub participants: Vec<Uuid>,
    #[serde(default)]
    pub game_mode_id: Option<Uuid>,
}

/// Payload forcing the result of a match.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OverrideResultRequest {
    pub player1_rounds_won: u8,
    pub player2_rounds_won: u8,
}

impl Validate for OverrideResultRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let total = u16::from(self.player1_rounds_won) + u16::from(self.player2_rounds_won);
        if total <= u16::from(ROUNDS_PER_MATCH) {
            return Ok(());
        }

        let mut err = ValidationError::new("rounds_won_total");
        err.message = Some(format!("rounds won cannot exceed {ROUNDS_PER_MATCH} in total").into());
        let mut errors = ValidationErrors::new();
        errors.add("player1_rounds_won", err);
        Err(errors)
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChampionshipStatusDto {
    Active,
    Completed,
}

impl From<ChampionshipStatus> for ChampionshipStatusDto {
    fn from(status: ChampionshipStatus) -> Self {
        match status {
            ChampionshipStatus::Active => ChampionshipStatusDto::Active,
            ChampionshipStatus::Completed => ChampionshipStatusDto::Completed,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatusDto {
    Pending,
    Completed,
}

impl From<MatchStatus> for MatchStatusDto {
    fn from(status: MatchStatus) -> Self {
        match status {
            MatchStatus::Pending => MatchStatusDto::Pending,
            MatchStatus::Completed => MatchStatusDto::Completed,
        }
    }
}

/// Championship header as listed.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChampionshipSummary {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub created_at: String,
    pub status: ChampionshipStatusDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_mode_id: Option<Uuid>,
}

impl From<&ChampionshipEntity> for ChampionshipSummary {
    fn from(entity: &ChampionshipEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name.clone(),
            created_by: entity.created_by,
            created_at: format_system_time(entity.created_at),
            status: entity.status.into(),
            game_mode_id: entity.game_mode_id,
        }
    }
}

/// One fixture pairing with player names.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchSummary {
    pub id: Uuid,
    pub championship_id: Uuid,
    pub round_number: u32,
    pub player1_id: Uuid,
    pub player1_name: String,
    pub player2_id: Uuid,
    pub player2_name: String,
    pub status: MatchStatusDto,
    pub player1_rounds_won: u8,
    pub player2_rounds_won: u8,
}

impl MatchSummary {
    pub fn new(entity: &MatchEntity, names: &HashMap<Uuid, String>) -> Self {
        Self {
            id: entity.id,
            championship_id: entity.championship_id,
            round_number: entity.round_number,
            player1_id: entity.player1_id,
            player1_name: display_name(names, entity.player1_id),
            player2_id: entity.player2_id,
            player2_name: display_name(names, entity.player2_id),
            status: entity.status.into(),
            player1_rounds_won: entity.player1_rounds_won,
            player2_rounds_won: entity.player2_rounds_won,
        }
    }
}

/// Standings line.
#[derive(Debug, Serialize, ToSchema)]
pub struct StandingItem {
    pub position: usize,
    pub user_id: Uuid,
    pub username: String,
    pub points: u32,
    pub matches_played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub rounds_won: u32,
}

impl StandingItem {
    pub fn new(position: usize, row: &StandingRow, names: &HashMap<Uuid, String>) -> Self {
        Self {
            position,
            user_id: row.user_id,
            username: display_name(names, row.user_id),
            points: row.points,
            matches_played: row.matches_played,
            wins: row.wins,
            draws: row.draws,
            losses: row.losses,
            rounds_won: row.rounds_won,
        }
    }
}

/// Full championship view: header, standings and fixture.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChampionshipDetail {
    pub championship: ChampionshipSummary,
    pub standings: Vec<StandingItem>,
    /// Lowest fixture round with a pending match (the last round once all are done).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_round: Option<u32>,
    pub matches: Vec<MatchSummary>,
}

/// Per-player statistics of a championship.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerMetricsItem {
    pub user_id: Uuid,
    pub username: String,
    pub average_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_distance_km: Option<f64>,
    pub best_score: f64,
    pub total_rounds: u32,
}

impl PlayerMetricsItem {
    pub fn new(metrics: &PlayerMetrics, names: &HashMap<Uuid, String>) -> Self {
        Self {
            user_id: metrics.user_id,
            username: display_name(names, metrics.user_id),
            average_score: metrics.average_score,
            average_distance_km: metrics.average_distance_km,
            best_score: metrics.best_score,
            total_rounds: metrics.total_rounds,
        }
    }
}

/// Player average on one continent.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContinentPlayerItem {
    pub user_id: Uuid,
    pub username: String,
    pub average_score: f64,
}

/// Roster performance on targets inside one continent.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContinentItem {
    pub continent: Continent,
    pub average_score: f64,
    pub players: Vec<ContinentPlayerItem>,
}

impl ContinentItem {
    pub fn new(performance: &ContinentPerformance, names: &HashMap<Uuid, String>) -> Self {
        Self {
            continent: performance.continent,
            average_score: performance.average_score,
            players: performance
                .players
                .iter()
                .map(|(user_id, average_score)| ContinentPlayerItem {
                    user_id: *user_id,
                    username: display_name(names, *user_id),
                    average_score: *average_score,
                })
                .collect(),
        }
    }
}

/// Championship statistics computed from every match guess.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChampionshipMetricsResponse {
    pub players: Vec<PlayerMetricsItem>,
    pub continents: Vec<ContinentItem>,
}

/// One in-match round with the guesses visible to the caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecapRound {
    pub round: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Coordinate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player1: Option<PlayedRound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player2: Option<PlayedRound>,
    /// Seat that won the round (`player1`, `player2`), absent on ties or while unplayed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

/// Match details with per-round results.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchRecapResponse {
    #[serde(rename = "match")]
    pub summary: MatchSummary,
    pub player1_rounds_played: u8,
    pub player2_rounds_played: u8,
    pub rounds: Vec<RecapRound>,
}

/// What a completion request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    /// This request finalised the match.
    Completed,
    /// The match had already been finalised; nothing changed.
    AlreadyCompleted,
    /// A player still has rounds to play.
    NotReady,
}

/// Result of a completion request with the match as it now stands.
#[derive(Debug, Serialize, ToSchema)]
pub struct CompletionResponse {
    pub outcome: CompletionKind,
    #[serde(rename = "match")]
    pub summary: MatchSummary,
}

/// Name from the profile cache, or [`UNKNOWN_USERNAME`].
pub fn display_name(names: &HashMap<Uuid, String>, user_id: Uuid) -> String {
    names
        .get(&user_id)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_USERNAME.to_owned())
}
