//! Process-local store. Every operation runs under one lock, which makes the multi-row
//! procedures atomic.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::SystemTime,
};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    calendar::GameDay,
    dao::{
        arena_store::ArenaStore,
        models::{
            ChampionshipDraft, ChampionshipEntity, ChampionshipStatus, CompletionOutcome,
            GameModeEntity, GuessEntity, MatchEntity, MatchRoundEntity, ParticipantEntity,
            PlayContext, ProfileEntity,
        },
        storage::{StorageError, StorageResult, WriteOutcome},
    },
    geo::Coordinate,
    tournament::completion::{self, Evaluation},
};

#[derive(Default)]
struct Tables {
    daily: HashMap<GameDay, Vec<Coordinate>>,
    match_rounds: HashMap<(Uuid, u8), Coordinate>,
    guesses: Vec<GuessEntity>,
    guess_keys: HashSet<(PlayContext, Uuid, u8)>,
    championships: IndexMap<Uuid, ChampionshipEntity>,
    participants: Vec<ParticipantEntity>,
    matches: IndexMap<Uuid, MatchEntity>,
    game_modes: IndexMap<Uuid, GameModeEntity>,
    profiles: IndexMap<Uuid, ProfileEntity>,
}

impl Tables {
    fn refresh_championship_status(&mut self, championship_id: Uuid) {
        let all_completed = self
            .matches
            .values()
            .filter(|m| m.championship_id == championship_id)
            .all(MatchEntity::is_completed);
        if let Some(championship) = self.championships.get_mut(&championship_id) {
            championship.status = if all_completed {
                ChampionshipStatus::Completed
            } else {
                ChampionshipStatus::Active
            };
        }
    }

    fn finalize(
        &mut self,
        match_id: Uuid,
        player1_rounds_won: u8,
        player2_rounds_won: u8,
    ) -> Option<MatchEntity> {
        let Tables {
            matches,
            participants,
            ..
        } = self;
        let entity = matches.get_mut(&match_id)?;
        completion::finalize(entity, participants, player1_rounds_won, player2_rounds_won);
        let updated = entity.clone();
        self.refresh_championship_status(updated.championship_id);
        Some(updated)
    }
}

/// [`ArenaStore`] backed by process memory. Used for development, tests and single-process
/// deployments.
#[derive(Clone, Default)]
pub struct MemoryArenaStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryArenaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArenaStore for MemoryArenaStore {
    fn find_daily_location(
        &self,
        day: GameDay,
        round: u8,
    ) -> BoxFuture<'static, StorageResult<Option<Coordinate>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            let index = usize::from(round).checked_sub(1);
            Ok(index.and_then(|i| tables.daily.get(&day).and_then(|list| list.get(i).copied())))
        })
    }

    fn append_daily_location(
        &self,
        day: GameDay,
        round: u8,
        target: Coordinate,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            if round == 0 {
                return Err(StorageError::rejected("daily rounds start at 1"));
            }
            let mut tables = store.tables.lock().await;
            let list = tables.daily.entry(day).or_default();
            let expected_len = usize::from(round) - 1;
            if list.len() == expected_len {
                list.push(target);
                Ok(WriteOutcome::Written)
            } else if list.len() > expected_len {
                Ok(WriteOutcome::Conflict)
            } else {
                Err(StorageError::rejected(format!(
                    "daily round {round} cannot be stored before round {}",
                    list.len() + 1
                )))
            }
        })
    }

    fn find_match_round(
        &self,
        match_id: Uuid,
        round: u8,
    ) -> BoxFuture<'static, StorageResult<Option<Coordinate>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables.match_rounds.get(&(match_id, round)).copied())
        })
    }

    fn insert_match_round(
        &self,
        round: MatchRoundEntity,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            let key = (round.match_id, round.round_number);
            if tables.match_rounds.contains_key(&key) {
                return Ok(WriteOutcome::Conflict);
            }
            tables.match_rounds.insert(key, round.target);
            Ok(WriteOutcome::Written)
        })
    }

    fn insert_guess(&self, guess: GuessEntity) -> BoxFuture<'static, StorageResult<WriteOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            if !tables.guess_keys.insert(guess.key()) {
                return Ok(WriteOutcome::Conflict);
            }
            tables.guesses.push(guess);
            Ok(WriteOutcome::Written)
        })
    }

    fn list_context_guesses(
        &self,
        context: PlayContext,
    ) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables
                .guesses
                .iter()
                .filter(|g| g.context == context)
                .cloned()
                .collect())
        })
    }

    fn list_match_guesses(
        &self,
        match_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let wanted: HashSet<Uuid> = match_ids.into_iter().collect();
            let tables = store.tables.lock().await;
            Ok(tables
                .guesses
                .iter()
                .filter(|g| matches!(g.context, PlayContext::Match(id) if wanted.contains(&id)))
                .cloned()
                .collect())
        })
    }

    fn list_daily_guesses(
        &self,
        since: Option<SystemTime>,
    ) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables
                .guesses
                .iter()
                .filter(|g| matches!(g.context, PlayContext::Daily(_)))
                .filter(|g| since.is_none_or(|since| g.created_at >= since))
                .cloned()
                .collect())
        })
    }

    fn create_championship(
        &self,
        draft: ChampionshipDraft,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            let id = draft.championship.id;
            if tables.championships.contains_key(&id) {
                return Err(StorageError::rejected(format!(
                    "championship {id} already exists"
                )));
            }
            if draft.matches.iter().any(|m| tables.matches.contains_key(&m.id)) {
                return Err(StorageError::rejected("match id collision"));
            }
            tables.championships.insert(id, draft.championship);
            tables.participants.extend(draft.participants);
            tables
                .matches
                .extend(draft.matches.into_iter().map(|m| (m.id, m)));
            Ok(())
        })
    }

    fn delete_championship(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            if tables.championships.shift_remove(&id).is_none() {
                return Ok(false);
            }
            let match_ids: HashSet<Uuid> = tables
                .matches
                .values()
                .filter(|m| m.championship_id == id)
                .map(|m| m.id)
                .collect();

            tables.participants.retain(|p| p.championship_id != id);
            tables.matches.retain(|match_id, _| !match_ids.contains(match_id));
            tables
                .match_rounds
                .retain(|(match_id, _), _| !match_ids.contains(match_id));
            let is_orphan = |context: &PlayContext| {
                matches!(context, PlayContext::Match(match_id) if match_ids.contains(match_id))
            };
            tables.guesses.retain(|g| !is_orphan(&g.context));
            tables.guess_keys.retain(|(context, _, _)| !is_orphan(context));
            Ok(true)
        })
    }

    fn find_championship(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ChampionshipEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables.championships.get(&id).cloned())
        })
    }

    fn list_championships(&self) -> BoxFuture<'static, StorageResult<Vec<ChampionshipEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables.championships.values().cloned().collect())
        })
    }

    fn list_participants(
        &self,
        championship_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables
                .participants
                .iter()
                .filter(|p| p.championship_id == championship_id)
                .cloned()
                .collect())
        })
    }

    fn list_matches(
        &self,
        championship_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables
                .matches
                .values()
                .filter(|m| m.championship_id == championship_id)
                .cloned()
                .collect())
        })
    }

    fn list_user_matches(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables
                .matches
                .values()
                .filter(|m| m.involves(user_id))
                .cloned()
                .collect())
        })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables.matches.get(&id).cloned())
        })
    }

    fn complete_match(
        &self,
        match_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CompletionOutcome>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            let Some(entity) = tables.matches.get(&match_id).cloned() else {
                return Ok(None);
            };
            if entity.is_completed() {
                return Ok(Some(CompletionOutcome::AlreadyCompleted(entity)));
            }

            let context = PlayContext::Match(match_id);
            let guesses: Vec<GuessEntity> = tables
                .guesses
                .iter()
                .filter(|g| g.context == context)
                .cloned()
                .collect();

            let outcome = match completion::evaluate(&entity, &guesses) {
                Evaluation::NotReady {
                    player1_rounds,
                    player2_rounds,
                } => CompletionOutcome::NotReady {
                    player1_rounds,
                    player2_rounds,
                },
                Evaluation::Ready {
                    player1_rounds_won,
                    player2_rounds_won,
                } => match tables.finalize(match_id, player1_rounds_won, player2_rounds_won) {
                    Some(updated) => CompletionOutcome::Completed(updated),
                    None => return Ok(None),
                },
            };
            Ok(Some(outcome))
        })
    }

    fn override_match_result(
        &self,
        match_id: Uuid,
        player1_rounds_won: u8,
        player2_rounds_won: u8,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            Ok(tables.finalize(match_id, player1_rounds_won, player2_rounds_won))
        })
    }

    fn save_game_mode(&self, mode: GameModeEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            tables.game_modes.insert(mode.id, mode);
            Ok(())
        })
    }

    fn find_game_mode(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameModeEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables.game_modes.get(&id).cloned())
        })
    }

    fn list_game_modes(&self) -> BoxFuture<'static, StorageResult<Vec<GameModeEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables.game_modes.values().cloned().collect())
        })
    }

    fn delete_game_mode(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            Ok(tables.game_modes.shift_remove(&id).is_some())
        })
    }

    fn save_profile(&self, profile: ProfileEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            tables.profiles.insert(profile.user_id, profile);
            Ok(())
        })
    }

    fn list_profiles(&self) -> BoxFuture<'static, StorageResult<Vec<ProfileEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables.profiles.values().cloned().collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::MatchStatus, state::match_progress::ROUNDS_PER_MATCH,
        tournament::fixture::draft_championship,
    };

    fn guess(context: PlayContext, user_id: Uuid, round: u8, score: f64) -> GuessEntity {
        GuessEntity {
            id: Uuid::new_v4(),
            context,
            user_id,
            round_number: round,
            guess: Some(Coordinate::new(1.0, 1.0)),
            target: Coordinate::new(0.0, 0.0),
            score,
            distance_km: Some(157.0),
            created_at: SystemTime::now(),
        }
    }

    async fn seeded(players: usize) -> (MemoryArenaStore, ChampionshipDraft) {
        let store = MemoryArenaStore::new();
        let roster: Vec<Uuid> = (0..players).map(|_| Uuid::new_v4()).collect();
        let draft = draft_championship("Cup".into(), Uuid::new_v4(), None, &roster).unwrap();
        store.create_championship(draft.clone()).await.unwrap();
        (store, draft)
    }

    async fn play_out(store: &MemoryArenaStore, entity: &MatchEntity, p1: f64, p2: f64) {
        let context = PlayContext::Match(entity.id);
        for round in 1..=ROUNDS_PER_MATCH {
            store
                .insert_guess(guess(context, entity.player1_id, round, p1))
                .await
                .unwrap();
            store
                .insert_guess(guess(context, entity.player2_id, round, p2))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn daily_list_is_append_only() {
        let store = MemoryArenaStore::new();
        let day = GameDay::today();
        let first = Coordinate::new(10.0, 10.0);

        assert!(store.append_daily_location(day, 2, first).await.is_err());
        assert_eq!(
            store.append_daily_location(day, 1, first).await.unwrap(),
            WriteOutcome::Written
        );
        assert_eq!(
            store
                .append_daily_location(day, 1, Coordinate::new(20.0, 20.0))
                .await
                .unwrap(),
            WriteOutcome::Conflict
        );
        assert_eq!(store.find_daily_location(day, 1).await.unwrap(), Some(first));
        assert_eq!(store.find_daily_location(day, 2).await.unwrap(), None);
        assert_eq!(store.find_daily_location(day, 0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn guesses_are_unique_per_context_user_and_round() {
        let store = MemoryArenaStore::new();
        let user = Uuid::new_v4();
        let context = PlayContext::Daily(GameDay::today());

        let first = store.insert_guess(guess(context, user, 1, 50.0)).await.unwrap();
        let again = store.insert_guess(guess(context, user, 1, 99.0)).await.unwrap();
        assert_eq!((first, again), (WriteOutcome::Written, WriteOutcome::Conflict));

        let stored = store.list_context_guesses(context).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].score, 50.0);
    }

    #[tokio::test]
    async fn concurrent_completion_applies_deltas_once() {
        let (store, draft) = seeded(2).await;
        let entity = draft.matches[0].clone();
        play_out(&store, &entity, 60.0, 40.0).await;

        let match_id = entity.id;
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.complete_match(match_id).await })
            })
            .collect();
        let mut completed = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                Some(CompletionOutcome::Completed(_)) => completed += 1,
                Some(CompletionOutcome::AlreadyCompleted(_)) => {}
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(completed, 1);

        let participants = store.list_participants(draft.championship.id).await.unwrap();
        let total_points: u32 = participants.iter().map(|p| p.points).sum();
        assert_eq!(total_points, 3);
        assert!(participants.iter().all(|p| p.matches_played == 1));

        let championship = store
            .find_championship(draft.championship.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(championship.status, ChampionshipStatus::Completed);
    }

    #[tokio::test]
    async fn completion_waits_for_both_players() {
        let (store, draft) = seeded(2).await;
        let entity = &draft.matches[0];
        store
            .insert_guess(guess(PlayContext::Match(entity.id), entity.player1_id, 1, 10.0))
            .await
            .unwrap();

        let outcome = store.complete_match(entity.id).await.unwrap();
        assert_eq!(
            outcome,
            Some(CompletionOutcome::NotReady {
                player1_rounds: 1,
                player2_rounds: 0
            })
        );
        assert_eq!(store.complete_match(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn override_replaces_the_previous_result() {
        let (store, draft) = seeded(3).await;
        let entity = draft.matches[0].clone();
        play_out(&store, &entity, 80.0, 20.0).await;
        store.complete_match(entity.id).await.unwrap();

        let updated = store
            .override_match_result(entity.id, 0, 6)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, MatchStatus::Completed);

        let participants = store.list_participants(draft.championship.id).await.unwrap();
        let points_of = |user: Uuid| {
            participants
                .iter()
                .find(|p| p.user_id == user)
                .map(|p| (p.points, p.wins, p.losses))
        };
        assert_eq!(points_of(entity.player1_id), Some((0, 0, 1)));
        assert_eq!(points_of(entity.player2_id), Some((3, 1, 0)));

        let championship = store
            .find_championship(draft.championship.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(championship.status, ChampionshipStatus::Active);
    }

    #[tokio::test]
    async fn deleting_a_championship_cascades() {
        let (store, draft) = seeded(4).await;
        let entity = draft.matches[0].clone();
        play_out(&store, &entity, 50.0, 50.0).await;
        store
            .insert_match_round(MatchRoundEntity {
                match_id: entity.id,
                round_number: 1,
                target: Coordinate::new(5.0, 5.0),
            })
            .await
            .unwrap();
        let daily = PlayContext::Daily(GameDay::today());
        store
            .insert_guess(guess(daily, entity.player1_id, 1, 70.0))
            .await
            .unwrap();

        assert!(store.delete_championship(draft.championship.id).await.unwrap());
        assert!(!store.delete_championship(draft.championship.id).await.unwrap());

        assert!(store.list_matches(draft.championship.id).await.unwrap().is_empty());
        assert!(
            store
                .list_participants(draft.championship.id)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(store.find_match_round(entity.id, 1).await.unwrap(), None);
        assert!(
            store
                .list_match_guesses(vec![entity.id])
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(store.list_daily_guesses(None).await.unwrap().len(), 1);
    }
}
