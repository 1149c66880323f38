use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::{
    calendar::GameDay,
    geo::{Coordinate, Region},
};

/// Lifecycle of a championship.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChampionshipStatus {
    Active,
    Completed,
}

/// Round-robin championship created by an admin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChampionshipEntity {
    /// Stable identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Admin who created it.
    pub created_by: Uuid,
    pub created_at: SystemTime,
    pub status: ChampionshipStatus,
    /// Game mode restricting target sampling, if any.
    pub game_mode_id: Option<Uuid>,
}

/// Per-championship aggregates of one player. Only match finalisation mutates them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    pub championship_id: Uuid,
    pub user_id: Uuid,
    pub points: u32,
    pub matches_played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

impl ParticipantEntity {
    /// Participant with zeroed aggregates.
    pub fn new(championship_id: Uuid, user_id: Uuid) -> Self {
        Self {
            championship_id,
            user_id,
            points: 0,
            matches_played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
        }
    }
}

/// Lifecycle of a match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Completed,
}

/// One fixture pairing, played asynchronously over six rounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    pub id: Uuid,
    pub championship_id: Uuid,
    pub player1_id: Uuid,
    pub player2_id: Uuid,
    /// Fixture round this match belongs to (1-based).
    pub round_number: u32,
    pub status: MatchStatus,
    pub player1_rounds_won: u8,
    pub player2_rounds_won: u8,
}

impl MatchEntity {
    /// Whether `user_id` plays in this match.
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.player1_id == user_id || self.player2_id == user_id
    }

    /// The other player, when `user_id` is a participant.
    pub fn opponent_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.player1_id == user_id {
            Some(self.player2_id)
        } else if self.player2_id == user_id {
            Some(self.player1_id)
        } else {
            None
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }
}

/// Canonical target of one in-match round. Written at most once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MatchRoundEntity {
    pub match_id: Uuid,
    pub round_number: u8,
    pub target: Coordinate,
}

/// Ordered list of free-play targets for one game day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyLocationSetEntity {
    pub location_date: GameDay,
    /// Index `i` holds the target of round `i + 1`.
    pub locations: Vec<Coordinate>,
}

/// Where a guess was played.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum PlayContext {
    /// Free daily play on the given game day.
    Daily(GameDay),
    /// Tournament play inside the given match.
    Match(Uuid),
}

/// One submitted (or timed-out) round. Unique per (context, user, round).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuessEntity {
    pub id: Uuid,
    pub context: PlayContext,
    pub user_id: Uuid,
    pub round_number: u8,
    /// `None` when the round clock ran out.
    pub guess: Option<Coordinate>,
    pub target: Coordinate,
    pub score: f64,
    pub distance_km: Option<f64>,
    pub created_at: SystemTime,
}

impl GuessEntity {
    /// Natural key of the row.
    pub fn key(&self) -> (PlayContext, Uuid, u8) {
        (self.context, self.user_id, self.round_number)
    }
}

/// Named set of circular regions restricting where targets are drawn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameModeEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: SystemTime,
    /// Empty means the whole world.
    pub regions: Vec<Region>,
}

/// Display name cached from the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileEntity {
    pub user_id: Uuid,
    pub username: String,
}

/// Everything written when a championship is created, persisted all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChampionshipDraft {
    pub championship: ChampionshipEntity,
    pub participants: Vec<ParticipantEntity>,
    pub matches: Vec<MatchEntity>,
}

/// Result of asking the store to finalise a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// This call finalised the match and applied the participant deltas.
    Completed(MatchEntity),
    /// The match had been finalised before; nothing changed.
    AlreadyCompleted(MatchEntity),
    /// At least one player has not played all rounds yet.
    NotReady {
        player1_rounds: u8,
        player2_rounds: u8,
    },
}
