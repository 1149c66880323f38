//! DTOs for free daily play and tournament rounds.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    calendar::GameDay,
    dao::models::{GuessEntity, PlayContext},
    dto::format_system_time,
    geo::Coordinate,
    scoring::{RoundScore, ScoringMode},
    state::round_clock::RoundTicket,
};

/// Round shown to the player, with the clock that is running for it.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundStartResponse {
    /// Game day (`YYYY-MM-DD`) for free play.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    /// Match identifier for tournament play.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<Uuid>,
    pub round: u8,
    pub total_rounds: u8,
    /// Panorama location the player has to find.
    pub target: Coordinate,
    pub scoring: ScoringMode,
    pub time_left_secs: f64,
    pub budget_secs: u64,
}

impl RoundStartResponse {
    pub fn new(context: PlayContext, total_rounds: u8, ticket: RoundTicket) -> Self {
        let (day, match_id) = context_parts(context);
        Self {
            day,
            match_id,
            round: ticket.round,
            total_rounds,
            target: ticket.target,
            scoring: ticket.mode,
            time_left_secs: ticket.clock.time_left_secs(),
            budget_secs: ticket.clock.budget().as_secs(),
        }
    }
}

/// Guess submitted for one round. Omitting `guess` records a timeout.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GuessRequest {
    pub round: u8,
    #[serde(default)]
    pub guess: Option<Coordinate>,
    /// Game day the round was shown for, as returned when it started. Daily play only.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "2025-05-04")]
    pub day: Option<GameDay>,
}

impl Validate for GuessRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.round == 0 {
            let mut err = ValidationError::new("round_range");
            err.message = Some("rounds start at 1".into());
            errors.add("round", err);
        }
        if let Some(guess) = &self.guess {
            if let Err(err) = validate_coordinate(guess) {
                errors.add("guess", err);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Ensure a coordinate is finite and inside the geographic ranges.
pub fn validate_coordinate(coordinate: &Coordinate) -> Result<(), ValidationError> {
    if coordinate.is_valid() {
        Ok(())
    } else {
        let mut err = ValidationError::new("coordinate_range");
        err.message = Some("latitude must be in [-90, 90] and longitude in [-180, 180]".into());
        Err(err)
    }
}

/// Outcome of a submitted round.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundResultResponse {
    pub round: u8,
    pub target: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guess: Option<Coordinate>,
    pub score: RoundScore,
    /// False when the score could not be stored; the round may be replayed.
    pub saved: bool,
    /// Next round to play, absent once every round is recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_round: Option<u8>,
    /// Set on the last round of a match: whether the match is now completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_completed: Option<bool>,
}

/// A recorded round as shown back to players.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayedRound {
    pub round: u8,
    pub target: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guess: Option<Coordinate>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub played_at: String,
}

impl From<&GuessEntity> for PlayedRound {
    fn from(entity: &GuessEntity) -> Self {
        Self {
            round: entity.round_number,
            target: entity.target,
            guess: entity.guess,
            score: entity.score,
            distance_km: entity.distance_km,
            played_at: format_system_time(entity.created_at),
        }
    }
}

/// Today's free-play progress of the caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct DailyStatusResponse {
    pub day: String,
    pub rounds_played: u8,
    pub round_limit: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_round: Option<u8>,
    pub total_score: f64,
    pub rounds: Vec<PlayedRound>,
}

/// Another player's guess on a daily round the caller already played.
#[derive(Debug, Serialize, ToSchema)]
pub struct OtherGuessItem {
    pub user_id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guess: Option<Coordinate>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

fn context_parts(context: PlayContext) -> (Option<String>, Option<Uuid>) {
    match context {
        PlayContext::Daily(day) => (Some(day.to_string()), None),
        PlayContext::Match(match_id) => (None, Some(match_id)),
    }
}
