//! Shared target cache: every player of "round R of day D" or "round R of match M" gets the
//! same coordinate, even when several sessions ask for it for the first time at once.

use std::future::Future;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    calendar::GameDay,
    dao::{
        arena_store::ArenaStore,
        models::MatchRoundEntity,
        storage::{StorageResult, WriteOutcome},
    },
    error::ServiceError,
    geo::{Coordinate, GeoError},
};

/// Round whose target is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKey {
    Daily { day: GameDay, round: u8 },
    Match { match_id: Uuid, round: u8 },
}

impl TargetKey {
    async fn read(&self, store: &dyn ArenaStore) -> StorageResult<Option<Coordinate>> {
        match *self {
            TargetKey::Daily { day, round } => store.find_daily_location(day, round).await,
            TargetKey::Match { match_id, round } => store.find_match_round(match_id, round).await,
        }
    }

    async fn write(
        &self,
        store: &dyn ArenaStore,
        target: Coordinate,
    ) -> StorageResult<WriteOutcome> {
        match *self {
            TargetKey::Daily { day, round } => {
                store.append_daily_location(day, round, target).await
            }
            TargetKey::Match { match_id, round } => {
                store
                    .insert_match_round(MatchRoundEntity {
                        match_id,
                        round_number: round,
                        target,
                    })
                    .await
            }
        }
    }

    /// Read that treats failures as a miss.
    async fn read_or_miss(&self, store: &dyn ArenaStore) -> Option<Coordinate> {
        match self.read(store).await {
            Ok(found) => found,
            Err(err) => {
                warn!(key = ?self, error = %err, "target read failed; treating as a miss");
                None
            }
        }
    }
}

/// Return the canonical target for `key`, generating and storing one if needed.
///
/// The candidate is generated before the second read, so racing callers may all generate; the
/// store's insert-if-absent semantics pick one winner and the losers return the winner's value.
pub async fn resolve_target<G, Fut>(
    store: &dyn ArenaStore,
    key: TargetKey,
    generate: G,
) -> Result<Coordinate, ServiceError>
where
    G: FnOnce() -> Fut,
    Fut: Future<Output = Result<Coordinate, GeoError>>,
{
    if let Some(existing) = key.read_or_miss(store).await {
        return Ok(existing);
    }

    let generated = generate().await;

    if let Some(existing) = key.read_or_miss(store).await {
        debug!(key = ?key, "target filled concurrently; discarding candidate");
        return Ok(existing);
    }

    let candidate = match generated {
        Ok(candidate) => candidate,
        Err(err) => {
            warn!(key = ?key, error = %err, "target generation failed");
            return Err(ServiceError::LocationUnavailable(err.to_string()));
        }
    };

    let write_error = match key.write(store, candidate).await {
        Ok(WriteOutcome::Written) => {
            info!(key = ?key, lat = candidate.lat, lng = candidate.lng, "stored new target");
            return Ok(candidate);
        }
        Ok(WriteOutcome::Conflict) => None,
        Err(err) => {
            warn!(key = ?key, error = %err, "target write failed");
            Some(err)
        }
    };

    match key.read(store).await {
        Ok(Some(stored)) => Ok(stored),
        Ok(None) => match write_error {
            Some(err) => Err(err.into()),
            None => Err(ServiceError::LocationUnavailable(
                "target write conflicted but no target is stored".into(),
            )),
        },
        Err(err) => Err(write_error.unwrap_or(err).into()),
    }
}

/// Resolve daily round `round`, filling any earlier missing rounds first since the day's
/// list only grows by appending.
pub async fn resolve_daily_target<G, Fut>(
    store: &dyn ArenaStore,
    day: GameDay,
    round: u8,
    generate: G,
) -> Result<Coordinate, ServiceError>
where
    G: Fn() -> Fut,
    Fut: Future<Output = Result<Coordinate, GeoError>>,
{
    if round == 0 {
        return Err(ServiceError::InvalidInput("rounds start at 1".into()));
    }
    for earlier in 1..round {
        resolve_target(store, TargetKey::Daily { day, round: earlier }, &generate).await?;
    }
    resolve_target(store, TargetKey::Daily { day, round }, &generate).await
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{
        dao::arena_store::memory::MemoryArenaStore,
        geo::{GeoProvider, RegionBounds, sampling::SamplingProvider},
    };

    #[tokio::test]
    async fn concurrent_resolvers_converge_on_one_target() {
        let store: Arc<dyn ArenaStore> = Arc::new(MemoryArenaStore::new());
        let match_id = Uuid::new_v4();
        let generated = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let generated = generated.clone();
                tokio::spawn(async move {
                    let key = TargetKey::Match { match_id, round: 1 };
                    resolve_target(store.as_ref(), key, || async move {
                        generated.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        SamplingProvider
                            .sample_valid_coordinate(RegionBounds::World)
                            .await
                    })
                    .await
                })
            })
            .collect();

        let mut targets = Vec::new();
        for handle in handles {
            targets.push(handle.await.unwrap().unwrap());
        }
        let stored = store.find_match_round(match_id, 1).await.unwrap().unwrap();
        assert!(generated.load(Ordering::SeqCst) >= 1);
        for target in targets {
            assert_eq!(target.lat.to_bits(), stored.lat.to_bits());
            assert_eq!(target.lng.to_bits(), stored.lng.to_bits());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_daily_resolvers_agree_on_every_round() {
        let store: Arc<dyn ArenaStore> = Arc::new(MemoryArenaStore::new());
        let day = GameDay::today();

        let handles: Vec<_> = (0..16u8)
            .map(|i| {
                let store = store.clone();
                let round = i % 3 + 1;
                tokio::spawn(async move {
                    let target = resolve_daily_target(store.as_ref(), day, round, || async {
                        tokio::task::yield_now().await;
                        SamplingProvider
                            .sample_valid_coordinate(RegionBounds::World)
                            .await
                    })
                    .await;
                    (round, target)
                })
            })
            .collect();

        let mut resolved = Vec::new();
        for handle in handles {
            let (round, target) = handle.await.unwrap();
            resolved.push((round, target.unwrap()));
        }
        for (round, target) in resolved {
            let stored = store.find_daily_location(day, round).await.unwrap().unwrap();
            assert_eq!(target.lat.to_bits(), stored.lat.to_bits());
            assert_eq!(target.lng.to_bits(), stored.lng.to_bits());
        }
        assert_eq!(store.find_daily_location(day, 4).await.unwrap(), None);
    }

    #[tokio::test]
    async fn existing_target_skips_generation() {
        let store = MemoryArenaStore::new();
        let day = GameDay::today();
        let known = Coordinate::new(12.0, 34.0);
        store.append_daily_location(day, 1, known).await.unwrap();

        let calls = AtomicUsize::new(0);
        let resolved = resolve_target(&store, TargetKey::Daily { day, round: 1 }, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(GeoError::Unavailable { attempts: 0 })
        })
        .await
        .unwrap();
        assert_eq!(resolved, known);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generation_failure_is_location_unavailable() {
        let store = MemoryArenaStore::new();
        let match_id = Uuid::new_v4();
        let key = TargetKey::Match { match_id, round: 1 };
        let result = resolve_target(&store, key, || async {
            Err(GeoError::Unavailable { attempts: 20 })
        })
        .await;
        assert!(matches!(result, Err(ServiceError::LocationUnavailable(_))));
        assert_eq!(store.find_match_round(match_id, 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn daily_resolution_fills_earlier_rounds() {
        let store = MemoryArenaStore::new();
        let day = GameDay::today();
        let generate = || async {
            SamplingProvider
                .sample_valid_coordinate(RegionBounds::World)
                .await
        };

        let third = resolve_daily_target(&store, day, 3, generate).await.unwrap();
        assert!(store.find_daily_location(day, 1).await.unwrap().is_some());
        assert!(store.find_daily_location(day, 2).await.unwrap().is_some());
        assert_eq!(store.find_daily_location(day, 3).await.unwrap(), Some(third));

        let again = resolve_daily_target(&store, day, 3, generate).await.unwrap();
        assert_eq!(again, third);
    }
}
