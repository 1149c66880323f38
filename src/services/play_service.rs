//! Round lifecycle shared by free daily play and tournament matches: open a round with its
//! clock, score the submitted guess, record it once, and expire rounds nobody answered.

use std::time::{Duration, SystemTime};

use tokio::time::sleep_until;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    calendar::GameDay,
    dao::{
        arena_store::ArenaStore,
        models::{GuessEntity, MatchEntity, PlayContext},
        storage::WriteOutcome,
    },
    dto::{
        championship::display_name,
        play::{
            DailyStatusResponse, OtherGuessItem, PlayedRound, RoundResultResponse,
            RoundStartResponse,
        },
    },
    error::ServiceError,
    geo::{Coordinate, RegionBounds},
    scoring::{ScoringMode, score_round},
    services::{
        location_service::{TargetKey, resolve_daily_target, resolve_target},
        match_service, profile_service,
    },
    state::{
        MatchSetup, SharedState,
        match_progress::{MatchProgress, ROUNDS_PER_MATCH, RoundProgress},
        round_clock::{RoundClock, RoundOwner, RoundTicket},
    },
};

/// Who is submitting a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOrigin {
    /// The player answered (or gave up) before the clock ran out.
    Player,
    /// The round clock expired and the server records a timeout.
    Expiry,
}

/// Open the caller's next free-play round of the current game day.
pub async fn start_daily_round(
    state: &SharedState,
    user_id: Uuid,
) -> Result<RoundStartResponse, ServiceError> {
    let store = state.require_arena_store().await?;
    let day = GameDay::today();
    let context = PlayContext::Daily(day);
    let limit = state.config().daily_round_limit;

    let guesses = store.list_context_guesses(context).await?;
    let Some(round) = daily_progress(&guesses, user_id, limit).next_round() else {
        return Err(ServiceError::InvalidState(format!(
            "all {limit} rounds of {day} were already played"
        )));
    };

    let geo = state.geo();
    let target = resolve_daily_target(store.as_ref(), day, round, || {
        geo.sample_valid_coordinate(RegionBounds::World)
    })
    .await?;

    let ticket = open_round(
        state,
        RoundOwner { context, user_id },
        round,
        target,
        ScoringMode::Absolute,
        state.config().daily_round_budget,
    );
    Ok(RoundStartResponse::new(context, limit, ticket))
}

/// Open the caller's next round of a tournament match.
pub async fn start_match_round(
    state: &SharedState,
    user_id: Uuid,
    match_id: Uuid,
) -> Result<RoundStartResponse, ServiceError> {
    let store = state.require_arena_store().await?;
    let match_entity = match_service::require_match(store.as_ref(), match_id).await?;
    let context = PlayContext::Match(match_id);

    let guesses = store.list_context_guesses(context).await?;
    let progress = MatchProgress::from_guesses(&match_entity, &guesses);
    let Some(round) = progress.next_round_for(user_id)? else {
        return Err(ServiceError::InvalidState(
            "every round of this match was played; waiting for the opponent".into(),
        ));
    };

    let setup = match_setup(state, store.as_ref(), &match_entity).await?;
    let geo = state.geo();
    let bounds = setup.bounds.clone();
    let target = resolve_target(
        store.as_ref(),
        TargetKey::Match { match_id, round },
        || geo.sample_valid_coordinate(bounds),
    )
    .await?;

    let ticket = open_round(
        state,
        RoundOwner { context, user_id },
        round,
        target,
        setup.mode,
        state.config().match_round_budget,
    );
    Ok(RoundStartResponse::new(context, ROUNDS_PER_MATCH, ticket))
}

/// Score and record one round.
///
/// `guess == None` records a timeout. Without an open clock the round is scored with zero time
/// left. A storage failure while saving is reported as `saved: false` instead of an error.
pub async fn submit_guess(
    state: &SharedState,
    user_id: Uuid,
    context: PlayContext,
    round: u8,
    guess: Option<Coordinate>,
    origin: SubmissionOrigin,
) -> Result<RoundResultResponse, ServiceError> {
    if guess.is_some_and(|guess| !guess.is_valid()) {
        return Err(ServiceError::InvalidInput(
            "guess coordinates are out of range".into(),
        ));
    }
    let store = state.require_arena_store().await?;
    let guesses = store.list_context_guesses(context).await?;

    let owner = RoundOwner { context, user_id };
    let (mut progress, match_entity) = match context {
        PlayContext::Daily(day) => {
            if origin == SubmissionOrigin::Player
                && day != GameDay::today()
                && !is_round_open(state, owner, round)
            {
                return Err(ServiceError::InvalidInput(format!(
                    "game day {day} is over"
                )));
            }
            let progress = daily_progress(&guesses, user_id, state.config().daily_round_limit);
            progress.check(round)?;
            (progress, None)
        }
        PlayContext::Match(match_id) => {
            let match_entity = match_service::require_match(store.as_ref(), match_id).await?;
            let progress = MatchProgress::from_guesses(&match_entity, &guesses);
            let seat = progress.check_submission(user_id, round)?;
            (progress.progress_of(seat), Some(match_entity))
        }
    };

    let (target, mode, time_left_secs) = match state.open_rounds().close(owner, round) {
        Some((ticket, expiry)) => {
            if origin == SubmissionOrigin::Player {
                if let Some(expiry) = expiry {
                    expiry.abort();
                }
            }
            (ticket.target, ticket.mode, ticket.clock.time_left_secs())
        }
        None => {
            let target = stored_target(store.as_ref(), context, round)
                .await?
                .ok_or_else(|| {
                    ServiceError::InvalidState(format!("round {round} has not been started"))
                })?;
            let mode = match &match_entity {
                Some(match_entity) => match_setup(state, store.as_ref(), match_entity).await?.mode,
                None => ScoringMode::Absolute,
            };
            warn!(%user_id, ?context, round, "no running clock for round; scoring with zero time left");
            (target, mode, 0.0)
        }
    };

    let score = score_round(mode, target, guess, time_left_secs);
    let entity = GuessEntity {
        id: Uuid::new_v4(),
        context,
        user_id,
        round_number: round,
        guess,
        target,
        score: score.total,
        distance_km: score.distance_km,
        created_at: SystemTime::now(),
    };

    let saved = match store.insert_guess(entity).await {
        Ok(WriteOutcome::Written) => true,
        Ok(WriteOutcome::Conflict) => return Err(ServiceError::DuplicateGuess { round }),
        Err(err) => {
            warn!(%user_id, ?context, round, error = %err, "failed to save round score");
            false
        }
    };

    let match_completed = match match_entity {
        Some(match_entity) if round == ROUNDS_PER_MATCH => {
            Some(saved && finish_match(state, store.as_ref(), &match_entity).await)
        }
        _ => None,
    };

    info!(
        %user_id,
        ?context,
        round,
        score = score.total,
        timed_out = guess.is_none(),
        saved,
        "round submitted"
    );

    let next_round = if saved {
        progress.record();
        progress.next_round()
    } else {
        Some(round)
    };
    Ok(RoundResultResponse {
        round,
        target,
        guess,
        score,
        saved,
        next_round,
        match_completed,
    })
}

/// The caller's rounds of the current game day.
pub async fn daily_status(
    state: &SharedState,
    user_id: Uuid,
) -> Result<DailyStatusResponse, ServiceError> {
    let store = state.require_arena_store().await?;
    let day = GameDay::today();
    let limit = state.config().daily_round_limit;

    let mut own: Vec<GuessEntity> = store
        .list_context_guesses(PlayContext::Daily(day))
        .await?
        .into_iter()
        .filter(|guess| guess.user_id == user_id)
        .collect();
    own.sort_by_key(|guess| guess.round_number);

    let progress = daily_progress(&own, user_id, limit);
    Ok(DailyStatusResponse {
        day: day.to_string(),
        rounds_played: progress.played,
        round_limit: limit,
        next_round: progress.next_round(),
        total_score: own.iter().map(|guess| guess.score).sum(),
        rounds: own.iter().map(PlayedRound::from).collect(),
    })
}

/// Guesses other players made today on the caller's daily round `round`.
///
/// Only available once the caller played that round.
pub async fn other_guesses(
    state: &SharedState,
    user_id: Uuid,
    round: u8,
) -> Result<Vec<OtherGuessItem>, ServiceError> {
    let store = state.require_arena_store().await?;
    let day = GameDay::today();

    let own_target = store
        .list_context_guesses(PlayContext::Daily(day))
        .await?
        .into_iter()
        .find(|guess| guess.user_id == user_id && guess.round_number == round)
        .map(|guess| guess.target)
        .ok_or_else(|| {
            ServiceError::InvalidState(format!("round {round} has not been played yet"))
        })?;

    let since = SystemTime::from(day.starts_at());
    let names = profile_service::usernames(store.as_ref()).await?;
    let mut others: Vec<OtherGuessItem> = store
        .list_daily_guesses(Some(since))
        .await?
        .into_iter()
        .filter(|guess| guess.user_id != user_id && guess.target == own_target)
        .map(|guess| OtherGuessItem {
            user_id: guess.user_id,
            username: display_name(&names, guess.user_id),
            guess: guess.guess,
            score: guess.score,
            distance_km: guess.distance_km,
        })
        .collect();
    others.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(others)
}

/// Region bounds and scoring formula of a match, cached after the first lookup.
pub async fn match_setup(
    state: &SharedState,
    store: &dyn ArenaStore,
    match_entity: &MatchEntity,
) -> Result<MatchSetup, ServiceError> {
    if let Some(setup) = state
        .match_setups()
        .get(&match_entity.id)
        .map(|entry| entry.value().clone())
    {
        return Ok(setup);
    }

    let game_mode_id = store
        .find_championship(match_entity.championship_id)
        .await?
        .and_then(|championship| championship.game_mode_id);
    let regions = match game_mode_id {
        Some(mode_id) => match store.find_game_mode(mode_id).await? {
            Some(mode) => mode.regions,
            None => {
                warn!(match_id = %match_entity.id, %mode_id, "game mode is gone; playing the whole world");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let setup = MatchSetup {
        bounds: RegionBounds::from_regions(&regions),
        mode: ScoringMode::relative_for(&regions),
    };
    debug!(match_id = %match_entity.id, regions = regions.len(), mode = ?setup.mode, "resolved match setup");
    state.match_setups().insert(match_entity.id, setup.clone());
    Ok(setup)
}

/// Game day a daily submission for `round` belongs to when the client did not say: the day of
/// the caller's open round if it started before the rollover, today otherwise.
pub fn daily_submission_day(state: &SharedState, user_id: Uuid, round: u8) -> GameDay {
    let today = GameDay::today();
    let owner = |day| RoundOwner {
        context: PlayContext::Daily(day),
        user_id,
    };
    if is_round_open(state, owner(today), round) {
        return today;
    }
    today
        .previous()
        .filter(|yesterday| is_round_open(state, owner(*yesterday), round))
        .unwrap_or(today)
}

fn is_round_open(state: &SharedState, owner: RoundOwner, round: u8) -> bool {
    state
        .open_rounds()
        .current(owner)
        .is_some_and(|ticket| ticket.round == round)
}

/// Run completion once both players stored their last round. Guesses are re-read after the
/// write so that whichever player finishes second always sees both sides.
async fn finish_match(
    state: &SharedState,
    store: &dyn ArenaStore,
    match_entity: &MatchEntity,
) -> bool {
    match store
        .list_context_guesses(PlayContext::Match(match_entity.id))
        .await
    {
        Ok(guesses) if !MatchProgress::from_guesses(match_entity, &guesses).both_finished() => {
            debug!(match_id = %match_entity.id, "match waits for the other player");
            false
        }
        Ok(_) => match_service::trigger_completion(state, store, match_entity.id).await,
        Err(err) => {
            warn!(
                match_id = %match_entity.id, error = %err,
                "could not re-read match guesses; evaluating completion anyway"
            );
            match_service::trigger_completion(state, store, match_entity.id).await
        }
    }
}

fn daily_progress(guesses: &[GuessEntity], user_id: Uuid, limit: u8) -> RoundProgress {
    RoundProgress::from_rounds(
        guesses
            .iter()
            .filter(|guess| guess.user_id == user_id)
            .map(|guess| guess.round_number),
        limit,
    )
}

async fn stored_target(
    store: &dyn ArenaStore,
    context: PlayContext,
    round: u8,
) -> Result<Option<Coordinate>, ServiceError> {
    let target = match context {
        PlayContext::Daily(day) => store.find_daily_location(day, round).await?,
        PlayContext::Match(match_id) => store.find_match_round(match_id, round).await?,
    };
    Ok(target)
}

/// Open (or resume) a round and arm its expiry task when the clock is new.
fn open_round(
    state: &SharedState,
    owner: RoundOwner,
    round: u8,
    target: Coordinate,
    mode: ScoringMode,
    budget: Duration,
) -> RoundTicket {
    let (ticket, fresh) = state.open_rounds().open(
        owner,
        RoundTicket {
            round,
            target,
            mode,
            clock: RoundClock::start(budget),
        },
    );
    if fresh {
        schedule_expiry(state, owner, ticket);
    } else {
        debug!(user_id = %owner.user_id, round, "resuming running round clock");
    }
    ticket
}

fn schedule_expiry(state: &SharedState, owner: RoundOwner, ticket: RoundTicket) {
    let task_state = state.clone();
    let task = tokio::spawn(async move {
        sleep_until(ticket.clock.deadline()).await;
        let outcome = submit_guess(
            &task_state,
            owner.user_id,
            owner.context,
            ticket.round,
            None,
            SubmissionOrigin::Expiry,
        )
        .await;
        match outcome {
            Ok(result) => info!(
                user_id = %owner.user_id,
                round = ticket.round,
                saved = result.saved,
                "round clock expired; recorded a timeout"
            ),
            Err(ServiceError::DuplicateGuess { .. }) => {
                debug!(user_id = %owner.user_id, round = ticket.round, "round answered before expiry")
            }
            Err(err) => warn!(
                user_id = %owner.user_id,
                round = ticket.round,
                error = %err,
                "failed to record expired round"
            ),
        }
    });
    state
        .open_rounds()
        .set_expiry(owner, ticket.round, task.abort_handle());
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{arena_store::memory::MemoryArenaStore, models::GameModeEntity},
        geo::{Region, sampling::SamplingProvider},
        state::AppState,
        tournament::fixture::draft_championship,
    };

    async fn state_with(config: AppConfig) -> (SharedState, Arc<MemoryArenaStore>) {
        let state = AppState::new(config, Arc::new(SamplingProvider));
        let store = Arc::new(MemoryArenaStore::new());
        state.install_arena_store(store.clone()).await;
        (state, store)
    }

    async fn seeded_match(store: &MemoryArenaStore, game_mode_id: Option<Uuid>) -> MatchEntity {
        let roster = [Uuid::new_v4(), Uuid::new_v4()];
        let draft = draft_championship("Duel".into(), Uuid::new_v4(), game_mode_id, &roster).unwrap();
        let entity = draft.matches[0].clone();
        store.create_championship(draft).await.unwrap();
        entity
    }

    #[tokio::test]
    async fn daily_rounds_advance_until_the_limit() {
        let config = AppConfig {
            daily_round_limit: 2,
            ..AppConfig::default()
        };
        let (state, _store) = state_with(config).await;
        let user = Uuid::new_v4();
        let day = GameDay::today();

        for expected in 1..=2u8 {
            let started = start_daily_round(&state, user).await.unwrap();
            assert_eq!(started.round, expected);
            let result = submit_guess(
                &state,
                user,
                PlayContext::Daily(day),
                expected,
                Some(started.target),
                SubmissionOrigin::Player,
            )
            .await
            .unwrap();
            assert!(result.saved);
            assert!(result.score.total >= 90.0);
        }

        assert!(matches!(
            start_daily_round(&state, user).await,
            Err(ServiceError::InvalidState(_))
        ));
        let status = daily_status(&state, user).await.unwrap();
        assert_eq!(status.rounds_played, 2);
        assert_eq!(status.next_round, None);
        assert!(state.open_rounds().is_empty());
    }

    #[tokio::test]
    async fn everyone_gets_the_same_daily_target() {
        let (state, _store) = state_with(AppConfig::default()).await;
        let first = start_daily_round(&state, Uuid::new_v4()).await.unwrap();
        let second = start_daily_round(&state, Uuid::new_v4()).await.unwrap();
        assert_eq!(first.target, second.target);
    }

    #[tokio::test]
    async fn out_of_order_and_repeated_rounds_are_rejected() {
        let (state, _store) = state_with(AppConfig::default()).await;
        let user = Uuid::new_v4();
        let context = PlayContext::Daily(GameDay::today());
        let started = start_daily_round(&state, user).await.unwrap();

        let skipped = submit_guess(&state, user, context, 2, None, SubmissionOrigin::Player).await;
        assert!(matches!(
            skipped,
            Err(ServiceError::OutOfOrder {
                requested: 2,
                expected: 1
            })
        ));

        submit_guess(&state, user, context, 1, Some(started.target), SubmissionOrigin::Player)
            .await
            .unwrap();
        let again = submit_guess(&state, user, context, 1, None, SubmissionOrigin::Player).await;
        assert!(matches!(again, Err(ServiceError::DuplicateGuess { round: 1 })));
    }

    #[tokio::test]
    async fn restarting_an_open_round_resumes_its_clock() {
        let (state, _store) = state_with(AppConfig::default()).await;
        let user = Uuid::new_v4();
        let first = start_daily_round(&state, user).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let again = start_daily_round(&state, user).await.unwrap();
        assert_eq!(again.round, first.round);
        assert!(again.time_left_secs < first.time_left_secs);
    }

    #[tokio::test]
    async fn expired_clock_records_a_timeout() {
        let config = AppConfig {
            daily_round_budget: Duration::from_millis(30),
            ..AppConfig::default()
        };
        let (state, store) = state_with(config).await;
        let user = Uuid::new_v4();
        let day = GameDay::today();
        start_daily_round(&state, user).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        let guesses = store
            .list_context_guesses(PlayContext::Daily(day))
            .await
            .unwrap();
        assert_eq!(guesses.len(), 1);
        assert_eq!(guesses[0].guess, None);
        assert_eq!(guesses[0].score, 0.0);
        assert!(state.open_rounds().is_empty());
    }

    #[tokio::test]
    async fn submission_without_a_clock_scores_no_time_bonus() {
        let (state, store) = state_with(AppConfig::default()).await;
        let user = Uuid::new_v4();
        let day = GameDay::today();
        let target = Coordinate::new(48.85, 2.35);
        store.append_daily_location(day, 1, target).await.unwrap();

        let result = submit_guess(
            &state,
            user,
            PlayContext::Daily(day),
            1,
            Some(Coordinate::new(48.95, 2.35)),
            SubmissionOrigin::Player,
        )
        .await
        .unwrap();
        assert_eq!(result.score.breakdown.time, 0.0);
        assert!(result.saved);
    }

    #[tokio::test]
    async fn round_started_before_rollover_is_scored_against_its_own_day() {
        let (state, store) = state_with(AppConfig::default()).await;
        let user = Uuid::new_v4();
        let today = GameDay::today();
        let yesterday = today.previous().unwrap();
        let shown = Coordinate::new(-33.86, 151.21);
        let todays_target = Coordinate::new(40.71, -74.0);
        store.append_daily_location(yesterday, 1, shown).await.unwrap();
        store.append_daily_location(today, 1, todays_target).await.unwrap();

        let owner = RoundOwner {
            context: PlayContext::Daily(yesterday),
            user_id: user,
        };
        state.open_rounds().open(
            owner,
            RoundTicket {
                round: 1,
                target: shown,
                mode: ScoringMode::Absolute,
                clock: RoundClock::start(Duration::from_secs(90)),
            },
        );

        let day = daily_submission_day(&state, user, 1);
        assert_eq!(day, yesterday);
        let result = submit_guess(
            &state,
            user,
            PlayContext::Daily(day),
            1,
            Some(shown),
            SubmissionOrigin::Player,
        )
        .await
        .unwrap();
        assert_eq!(result.target, shown);
        assert!(result.score.total > 99.0);
        assert!(
            store
                .list_context_guesses(PlayContext::Daily(today))
                .await
                .unwrap()
                .is_empty()
        );

        // Once that round is closed the old day only accepts the expiry path.
        assert_eq!(daily_submission_day(&state, user, 1), today);
        let late = submit_guess(
            &state,
            Uuid::new_v4(),
            PlayContext::Daily(yesterday),
            1,
            Some(shown),
            SubmissionOrigin::Player,
        )
        .await;
        assert!(matches!(late, Err(ServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn match_uses_relative_scoring_and_completes_after_six_rounds() {
        let (state, store) = state_with(AppConfig::default()).await;
        let entity = seeded_match(&store, None).await;
        let context = PlayContext::Match(entity.id);

        for (player, offset) in [(entity.player1_id, 0.0), (entity.player2_id, 1.0)] {
            for round in 1..=ROUNDS_PER_MATCH {
                let started = start_match_round(&state, player, entity.id).await.unwrap();
                assert_eq!(started.round, round);
                assert_eq!(started.scoring, ScoringMode::Ladder);
                let guess = Coordinate::new(started.target.lat + offset, started.target.lng);
                let result = submit_guess(
                    &state,
                    player,
                    context,
                    round,
                    Some(guess),
                    SubmissionOrigin::Player,
                )
                .await
                .unwrap();
                assert_eq!(result.score.breakdown.time, 0.0);
                if round == ROUNDS_PER_MATCH {
                    assert_eq!(result.match_completed, Some(player == entity.player2_id));
                }
            }
        }

        let completed = store.find_match(entity.id).await.unwrap().unwrap();
        assert!(completed.is_completed());
        assert_eq!(completed.player1_rounds_won, ROUNDS_PER_MATCH);
        assert_eq!(completed.player2_rounds_won, 0);
        assert!(matches!(
            start_match_round(&state, entity.player1_id, entity.id).await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn simultaneous_last_rounds_still_complete_the_match() {
        let (state, store) = state_with(AppConfig::default()).await;
        let entity = seeded_match(&store, None).await;
        let context = PlayContext::Match(entity.id);
        let players = [entity.player1_id, entity.player2_id];

        for round in 1..ROUNDS_PER_MATCH {
            for player in players {
                let started = start_match_round(&state, player, entity.id).await.unwrap();
                assert_eq!(started.round, round);
                let result = submit_guess(
                    &state,
                    player,
                    context,
                    round,
                    Some(started.target),
                    SubmissionOrigin::Player,
                )
                .await
                .unwrap();
                assert_eq!(result.match_completed, None);
            }
        }
        for player in players {
            start_match_round(&state, player, entity.id).await.unwrap();
        }

        let finish = |player| {
            let state = state.clone();
            tokio::spawn(async move {
                submit_guess(
                    &state,
                    player,
                    context,
                    ROUNDS_PER_MATCH,
                    None,
                    SubmissionOrigin::Player,
                )
                .await
            })
        };
        let (first, second) = tokio::join!(finish(players[0]), finish(players[1]));
        let outcomes = [
            first.unwrap().unwrap().match_completed,
            second.unwrap().unwrap().match_completed,
        ];
        assert!(outcomes.contains(&Some(true)));

        let completed = store.find_match(entity.id).await.unwrap().unwrap();
        assert!(completed.is_completed());
    }

    #[tokio::test]
    async fn match_targets_follow_the_game_mode_regions() {
        let (state, store) = state_with(AppConfig::default()).await;
        let region = Region {
            center: Coordinate::new(-34.6, -58.4),
            radius_m: 30_000.0,
        };
        let mode = GameModeEntity {
            id: Uuid::new_v4(),
            name: "Buenos Aires".into(),
            description: None,
            created_by: Uuid::new_v4(),
            created_at: SystemTime::now(),
            regions: vec![region],
        };
        store.save_game_mode(mode.clone()).await.unwrap();
        let entity = seeded_match(&store, Some(mode.id)).await;

        let started = start_match_round(&state, entity.player1_id, entity.id)
            .await
            .unwrap();
        assert_eq!(started.scoring, ScoringMode::Tiered { threshold_km: 30.0 });
        assert!(crate::geo::distance_km(region.center, started.target) <= 30.0 + 1e-6);

        let opponent = start_match_round(&state, entity.player2_id, entity.id)
            .await
            .unwrap();
        assert_eq!(opponent.target, started.target);
    }

    #[tokio::test]
    async fn outsiders_cannot_play_a_match() {
        let (state, store) = state_with(AppConfig::default()).await;
        let entity = seeded_match(&store, None).await;
        assert!(matches!(
            start_match_round(&state, Uuid::new_v4(), entity.id).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn other_guesses_need_the_round_played_first() {
        let (state, _store) = state_with(AppConfig::default()).await;
        let day = GameDay::today();
        let (me, rival) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(matches!(
            other_guesses(&state, me, 1).await,
            Err(ServiceError::InvalidState(_))
        ));

        for user in [rival, me] {
            let started = start_daily_round(&state, user).await.unwrap();
            submit_guess(
                &state,
                user,
                PlayContext::Daily(day),
                1,
                Some(started.target),
                SubmissionOrigin::Player,
            )
            .await
            .unwrap();
        }

        let others = other_guesses(&state, me, 1).await.unwrap();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].user_id, rival);
        assert_eq!(others[0].username, "Unknown");
    }
}
