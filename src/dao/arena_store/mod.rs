pub mod memory;
#[cfg(feature = "rest-store")]
pub mod postgrest;

use std::time::SystemTime;

use crate::calendar::GameDay;
use crate::dao::models::{
    ChampionshipDraft, ChampionshipEntity, CompletionOutcome, GameModeEntity, GuessEntity,
    MatchEntity, MatchRoundEntity, ParticipantEntity, PlayContext, ProfileEntity,
};
use crate::dao::storage::{StorageResult, WriteOutcome};
use crate::geo::Coordinate;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for targets, guesses and championships.
///
/// Target and guess writes are insert-if-absent; the championship procedures are atomic.
pub trait ArenaStore: Send + Sync {
    fn find_daily_location(
        &self,
        day: GameDay,
        round: u8,
    ) -> BoxFuture<'static, StorageResult<Option<Coordinate>>>;
    /// Append the target of `round` to the day's list. Conflicts unless the list holds exactly
    /// `round - 1` entries.
    fn append_daily_location(
        &self,
        day: GameDay,
        round: u8,
        target: Coordinate,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>>;
    fn find_match_round(
        &self,
        match_id: Uuid,
        round: u8,
    ) -> BoxFuture<'static, StorageResult<Option<Coordinate>>>;
    fn insert_match_round(
        &self,
        round: MatchRoundEntity,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>>;

    fn insert_guess(&self, guess: GuessEntity) -> BoxFuture<'static, StorageResult<WriteOutcome>>;
    fn list_context_guesses(
        &self,
        context: PlayContext,
    ) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>>;
    fn list_match_guesses(
        &self,
        match_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>>;
    /// Free-play guesses created at or after `since` (all of them when `None`).
    fn list_daily_guesses(
        &self,
        since: Option<SystemTime>,
    ) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>>;

    fn create_championship(&self, draft: ChampionshipDraft)
    -> BoxFuture<'static, StorageResult<()>>;
    /// Remove a championship with its participants, matches, rounds and match guesses.
    fn delete_championship(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    fn find_championship(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ChampionshipEntity>>>;
    fn list_championships(&self) -> BoxFuture<'static, StorageResult<Vec<ChampionshipEntity>>>;
    fn list_participants(
        &self,
        championship_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    fn list_matches(
        &self,
        championship_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;
    fn list_user_matches(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;
    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Finalise a match whose players both reached the last round. Idempotent.
    fn complete_match(
        &self,
        match_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CompletionOutcome>>>;
    /// Force a result, reverting the deltas of a previous one.
    fn override_match_result(
        &self,
        match_id: Uuid,
        player1_rounds_won: u8,
        player2_rounds_won: u8,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;

    fn save_game_mode(&self, mode: GameModeEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_game_mode(&self, id: Uuid)
    -> BoxFuture<'static, StorageResult<Option<GameModeEntity>>>;
    fn list_game_modes(&self) -> BoxFuture<'static, StorageResult<Vec<GameModeEntity>>>;
    fn delete_game_mode(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    fn save_profile(&self, profile: ProfileEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn list_profiles(&self) -> BoxFuture<'static, StorageResult<Vec<ProfileEntity>>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
