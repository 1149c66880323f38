//! Match completion, recaps and admin overrides.

use std::collections::HashMap;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        arena_store::ArenaStore,
        models::{CompletionOutcome, GuessEntity, MatchEntity, PlayContext},
    },
    dto::{
        championship::{
            CompletionKind, CompletionResponse, MatchRecapResponse, MatchSummary, RecapRound,
        },
        play::PlayedRound,
    },
    error::ServiceError,
    services::profile_service,
    state::{
        SharedState,
        match_progress::{MatchProgress, ROUNDS_PER_MATCH, Seat},
    },
    tournament::standings::pending_matches_for,
};

/// Load a match or fail with [`ServiceError::NotFound`].
pub async fn require_match(
    store: &dyn ArenaStore,
    match_id: Uuid,
) -> Result<MatchEntity, ServiceError> {
    store
        .find_match(match_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("match `{match_id}` not found")))
}

/// Run completion evaluation after a final round, logging instead of failing.
///
/// Returns whether the match is completed once the call returns.
pub async fn trigger_completion(
    state: &SharedState,
    store: &dyn ArenaStore,
    match_id: Uuid,
) -> bool {
    match store.complete_match(match_id).await {
        Ok(Some(CompletionOutcome::Completed(entity))) => {
            info!(
                %match_id,
                player1_rounds_won = entity.player1_rounds_won,
                player2_rounds_won = entity.player2_rounds_won,
                "match completed"
            );
            state.match_setups().remove(&match_id);
            true
        }
        Ok(Some(CompletionOutcome::AlreadyCompleted(_))) => true,
        Ok(Some(CompletionOutcome::NotReady {
            player1_rounds,
            player2_rounds,
        })) => {
            debug!(%match_id, player1_rounds, player2_rounds, "match waits for the other player");
            false
        }
        Ok(None) => {
            warn!(%match_id, "match vanished before completion");
            false
        }
        Err(err) => {
            warn!(%match_id, error = %err, "match completion failed; it can be retried");
            false
        }
    }
}

/// Evaluate completion on request. Safe to call any number of times.
pub async fn complete(
    state: &SharedState,
    match_id: Uuid,
) -> Result<CompletionResponse, ServiceError> {
    let store = state.require_arena_store().await?;
    let outcome = store
        .complete_match(match_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("match `{match_id}` not found")))?;

    let (outcome, entity) = match outcome {
        CompletionOutcome::Completed(entity) => {
            info!(%match_id, "match completed on request");
            state.match_setups().remove(&match_id);
            (CompletionKind::Completed, entity)
        }
        CompletionOutcome::AlreadyCompleted(entity) => (CompletionKind::AlreadyCompleted, entity),
        CompletionOutcome::NotReady { .. } => (
            CompletionKind::NotReady,
            require_match(store.as_ref(), match_id).await?,
        ),
    };

    let names = profile_service::usernames(store.as_ref()).await?;
    Ok(CompletionResponse {
        outcome,
        summary: MatchSummary::new(&entity, &names),
    })
}

/// Force a match result. A previous result is reverted before the new one is applied.
pub async fn override_result(
    state: &SharedState,
    match_id: Uuid,
    player1_rounds_won: u8,
    player2_rounds_won: u8,
) -> Result<MatchSummary, ServiceError> {
    if u16::from(player1_rounds_won) + u16::from(player2_rounds_won) > u16::from(ROUNDS_PER_MATCH)
    {
        return Err(ServiceError::InvalidInput(format!(
            "rounds won cannot exceed {ROUNDS_PER_MATCH} in total"
        )));
    }

    let store = state.require_arena_store().await?;
    let entity = store
        .override_match_result(match_id, player1_rounds_won, player2_rounds_won)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("match `{match_id}` not found")))?;
    state.match_setups().remove(&match_id);
    info!(
        %match_id,
        player1_rounds_won, player2_rounds_won, "match result overridden"
    );

    let names = profile_service::usernames(store.as_ref()).await?;
    Ok(MatchSummary::new(&entity, &names))
}

/// Match with its per-round results.
///
/// Until the match is completed a participant only sees the rounds they already played, and
/// everyone else sees no round at all.
pub async fn recap(
    state: &SharedState,
    match_id: Uuid,
    viewer: Option<Uuid>,
) -> Result<MatchRecapResponse, ServiceError> {
    let store = state.require_arena_store().await?;
    let entity = require_match(store.as_ref(), match_id).await?;
    let guesses = store
        .list_context_guesses(PlayContext::Match(match_id))
        .await?;
    let progress = MatchProgress::from_guesses(&entity, &guesses);

    let visible_rounds = if entity.is_completed() {
        ROUNDS_PER_MATCH
    } else {
        viewer
            .and_then(|viewer| progress.seat_of(viewer).ok())
            .map(|seat| progress.progress_of(seat).played)
            .unwrap_or(0)
    };

    let mut rounds = Vec::with_capacity(usize::from(ROUNDS_PER_MATCH));
    for round in 1..=visible_rounds {
        let player1 = guess_of(&guesses, entity.player1_id, round);
        let player2 = guess_of(&guesses, entity.player2_id, round);
        let target = match player1.or(player2) {
            Some(guess) => Some(guess.target),
            None => store.find_match_round(match_id, round).await?,
        };
        rounds.push(RecapRound {
            round,
            target,
            player1: player1.map(PlayedRound::from),
            player2: player2.map(PlayedRound::from),
            winner: round_winner(player1, player2).map(|seat| match seat {
                Seat::Player1 => "player1".to_owned(),
                Seat::Player2 => "player2".to_owned(),
            }),
        });
    }

    let names = profile_service::usernames(store.as_ref()).await?;
    Ok(MatchRecapResponse {
        summary: MatchSummary::new(&entity, &names),
        player1_rounds_played: progress.player1.played,
        player2_rounds_played: progress.player2.played,
        rounds,
    })
}

/// Pending matches of `user_id` across every championship, by fixture round.
pub async fn pending_matches(
    state: &SharedState,
    user_id: Uuid,
) -> Result<Vec<MatchSummary>, ServiceError> {
    let store = state.require_arena_store().await?;
    let matches = store.list_user_matches(user_id).await?;
    let names: HashMap<Uuid, String> = profile_service::usernames(store.as_ref()).await?;
    Ok(pending_matches_for(user_id, &matches)
        .iter()
        .map(|entity| MatchSummary::new(entity, &names))
        .collect())
}

fn guess_of(guesses: &[GuessEntity], user_id: Uuid, round: u8) -> Option<&GuessEntity> {
    guesses
        .iter()
        .find(|guess| guess.user_id == user_id && guess.round_number == round)
}

fn round_winner(player1: Option<&GuessEntity>, player2: Option<&GuessEntity>) -> Option<Seat> {
    let (player1, player2) = (player1?, player2?);
    if player1.score > player2.score {
        Some(Seat::Player1)
    } else if player2.score > player1.score {
        Some(Seat::Player2)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::SystemTime};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{arena_store::memory::MemoryArenaStore, models::ProfileEntity},
        geo::{Coordinate, sampling::SamplingProvider},
        state::AppState,
        tournament::fixture::draft_championship,
    };

    async fn setup() -> (SharedState, Arc<MemoryArenaStore>, MatchEntity) {
        let state = AppState::new(AppConfig::default(), Arc::new(SamplingProvider));
        let store = Arc::new(MemoryArenaStore::new());
        state.install_arena_store(store.clone()).await;
        let roster = [Uuid::new_v4(), Uuid::new_v4()];
        let draft = draft_championship("Final".into(), Uuid::new_v4(), None, &roster).unwrap();
        let entity = draft.matches[0].clone();
        store.create_championship(draft).await.unwrap();
        (state, store, entity)
    }

    async fn play(store: &MemoryArenaStore, match_id: Uuid, user_id: Uuid, rounds: u8, score: f64) {
        for round in 1..=rounds {
            store
                .insert_guess(GuessEntity {
                    id: Uuid::new_v4(),
                    context: PlayContext::Match(match_id),
                    user_id,
                    round_number: round,
                    guess: Some(Coordinate::new(0.0, 0.0)),
                    target: Coordinate::new(1.0, 1.0),
                    score,
                    distance_km: Some(157.0),
                    created_at: SystemTime::now(),
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn completion_is_idempotent_on_request() {
        let (state, store, entity) = setup().await;
        play(&store, entity.id, entity.player1_id, ROUNDS_PER_MATCH, 80.0).await;

        let early = complete(&state, entity.id).await.unwrap();
        assert_eq!(early.outcome, CompletionKind::NotReady);

        play(&store, entity.id, entity.player2_id, ROUNDS_PER_MATCH, 20.0).await;
        let done = complete(&state, entity.id).await.unwrap();
        assert_eq!(done.outcome, CompletionKind::Completed);
        assert_eq!(done.summary.player1_rounds_won, ROUNDS_PER_MATCH);

        let again = complete(&state, entity.id).await.unwrap();
        assert_eq!(again.outcome, CompletionKind::AlreadyCompleted);
        let participants = store.list_participants(entity.championship_id).await.unwrap();
        let winner = participants
            .iter()
            .find(|p| p.user_id == entity.player1_id)
            .unwrap();
        assert_eq!(winner.points, 3);
        assert_eq!(winner.matches_played, 1);
    }

    #[tokio::test]
    async fn override_validates_the_round_total() {
        let (state, _store, entity) = setup().await;
        assert!(matches!(
            override_result(&state, entity.id, 5, 2).await,
            Err(ServiceError::InvalidInput(_))
        ));
        let summary = override_result(&state, entity.id, 2, 2).await.unwrap();
        assert_eq!(summary.player1_rounds_won, 2);
        assert!(matches!(
            override_result(&state, Uuid::new_v4(), 1, 0).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn recap_hides_rounds_the_viewer_has_not_played() {
        let (state, store, entity) = setup().await;
        store
            .save_profile(ProfileEntity {
                user_id: entity.player1_id,
                username: "lea".into(),
            })
            .await
            .unwrap();
        play(&store, entity.id, entity.player1_id, 4, 50.0).await;
        play(&store, entity.id, entity.player2_id, 2, 60.0).await;

        let for_player2 = recap(&state, entity.id, Some(entity.player2_id)).await.unwrap();
        assert_eq!(for_player2.rounds.len(), 2);
        assert_eq!(for_player2.rounds[0].winner.as_deref(), Some("player2"));
        assert_eq!(for_player2.summary.player1_name, "lea");
        assert_eq!(for_player2.summary.player2_name, "Unknown");

        let for_player1 = recap(&state, entity.id, Some(entity.player1_id)).await.unwrap();
        assert_eq!(for_player1.rounds.len(), 4);
        assert!(for_player1.rounds[3].player2.is_none());

        let for_outsider = recap(&state, entity.id, None).await.unwrap();
        assert!(for_outsider.rounds.is_empty());
        assert_eq!(for_outsider.player1_rounds_played, 4);
    }

    #[tokio::test]
    async fn pending_matches_disappear_once_completed() {
        let (state, _store, entity) = setup().await;
        let pending = pending_matches(&state, entity.player1_id).await.unwrap();
        assert_eq!(pending.len(), 1);

        override_result(&state, entity.id, 3, 1).await.unwrap();
        assert!(
            pending_matches(&state, entity.player1_id)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
