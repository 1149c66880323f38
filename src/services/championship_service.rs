//! Championship lifecycle and read models: creation with its fixture, standings, statistics
//! and deletion.

use std::cmp::Reverse;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{MatchEntity, ParticipantEntity},
    dto::championship::{
        ChampionshipDetail, ChampionshipMetricsResponse, ChampionshipSummary, ContinentItem,
        CreateChampionshipRequest, MatchSummary, PlayerMetricsItem, StandingItem,
    },
    error::ServiceError,
    services::profile_service,
    state::SharedState,
    tournament::{
        fixture::draft_championship,
        metrics::{continent_performance, player_metrics},
        standings::{next_playable_round, recompute_participants, standings},
    },
};

/// Create a championship, its participants and its whole round-robin fixture at once.
pub async fn create_championship(
    state: &SharedState,
    created_by: Uuid,
    request: CreateChampionshipRequest,
) -> Result<ChampionshipSummary, ServiceError> {
    let name = request.name.trim().to_owned();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("championship name is empty".into()));
    }

    let store = state.require_arena_store().await?;
    if let Some(mode_id) = request.game_mode_id {
        if store.find_game_mode(mode_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "game mode `{mode_id}` not found"
            )));
        }
    }

    let draft = draft_championship(name, created_by, request.game_mode_id, &request.participants)?;
    let summary = ChampionshipSummary::from(&draft.championship);
    let (participants, matches) = (draft.participants.len(), draft.matches.len());
    store.create_championship(draft).await?;

    info!(
        championship_id = %summary.id,
        participants,
        matches,
        "championship created"
    );
    Ok(summary)
}

/// Every championship, newest first.
pub async fn list_championships(
    state: &SharedState,
) -> Result<Vec<ChampionshipSummary>, ServiceError> {
    let store = state.require_arena_store().await?;
    let mut championships = store.list_championships().await?;
    championships.sort_by_key(|championship| Reverse(championship.created_at));
    Ok(championships.iter().map(ChampionshipSummary::from).collect())
}

/// Header, standings, current round and fixture of one championship.
pub async fn championship_detail(
    state: &SharedState,
    id: Uuid,
) -> Result<ChampionshipDetail, ServiceError> {
    let store = state.require_arena_store().await?;
    let championship = store
        .find_championship(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let stored = store.list_participants(id).await?;
    let mut matches = store.list_matches(id).await?;
    matches.sort_by_key(|m| m.round_number);

    let participants = checked_aggregates(id, stored, &matches);
    let names = profile_service::usernames(store.as_ref()).await?;

    Ok(ChampionshipDetail {
        championship: ChampionshipSummary::from(&championship),
        standings: standings(&participants, &matches)
            .iter()
            .enumerate()
            .map(|(index, row)| StandingItem::new(index + 1, row, &names))
            .collect(),
        current_round: next_playable_round(&matches),
        matches: matches
            .iter()
            .map(|entity| MatchSummary::new(entity, &names))
            .collect(),
    })
}

/// Per-player and per-continent statistics over every guess of the championship.
pub async fn championship_metrics(
    state: &SharedState,
    id: Uuid,
) -> Result<ChampionshipMetricsResponse, ServiceError> {
    let store = state.require_arena_store().await?;
    if store.find_championship(id).await?.is_none() {
        return Err(not_found(id));
    }

    let roster: Vec<Uuid> = store
        .list_participants(id)
        .await?
        .into_iter()
        .map(|participant| participant.user_id)
        .collect();
    let match_ids = store
        .list_matches(id)
        .await?
        .into_iter()
        .map(|entity| entity.id)
        .collect();
    let guesses = store.list_match_guesses(match_ids).await?;
    let names = profile_service::usernames(store.as_ref()).await?;

    Ok(ChampionshipMetricsResponse {
        players: player_metrics(&roster, &guesses)
            .iter()
            .map(|metrics| PlayerMetricsItem::new(metrics, &names))
            .collect(),
        continents: continent_performance(&roster, &guesses)
            .iter()
            .map(|performance| ContinentItem::new(performance, &names))
            .collect(),
    })
}

/// Delete a championship with its participants, matches, round targets and match guesses.
pub async fn delete_championship(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_arena_store().await?;
    let match_ids: Vec<Uuid> = store
        .list_matches(id)
        .await?
        .into_iter()
        .map(|entity| entity.id)
        .collect();

    if !store.delete_championship(id).await? {
        return Err(not_found(id));
    }
    for match_id in &match_ids {
        state.match_setups().remove(match_id);
    }
    info!(championship_id = %id, matches = match_ids.len(), "championship deleted");
    Ok(())
}

/// Stored aggregates, replaced by the recomputed ones when they drifted from the results.
fn checked_aggregates(
    championship_id: Uuid,
    stored: Vec<ParticipantEntity>,
    matches: &[MatchEntity],
) -> Vec<ParticipantEntity> {
    let rebuilt = recompute_participants(&stored, matches);
    if rebuilt == stored {
        stored
    } else {
        warn!(%championship_id, "participant aggregates drifted from match results; using recomputed values");
        rebuilt
    }
}

fn not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("championship `{id}` not found"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::arena_store::{ArenaStore, memory::MemoryArenaStore},
        geo::sampling::SamplingProvider,
        services::match_service,
        state::AppState,
    };

    async fn setup() -> (SharedState, Arc<MemoryArenaStore>) {
        let state = AppState::new(AppConfig::default(), Arc::new(SamplingProvider));
        let store = Arc::new(MemoryArenaStore::new());
        state.install_arena_store(store.clone()).await;
        (state, store)
    }

    fn request(participants: Vec<Uuid>) -> CreateChampionshipRequest {
        CreateChampionshipRequest {
            name: "  Autumn league ".into(),
            participants,
            game_mode_id: None,
        }
    }

    #[tokio::test]
    async fn creation_writes_the_whole_fixture() {
        let (state, _store) = setup().await;
        let roster: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let summary = create_championship(&state, Uuid::new_v4(), request(roster))
            .await
            .unwrap();
        assert_eq!(summary.name, "Autumn league");

        let detail = championship_detail(&state, summary.id).await.unwrap();
        assert_eq!(detail.matches.len(), 6);
        assert_eq!(detail.standings.len(), 4);
        assert_eq!(detail.current_round, Some(1));
        assert!(detail.standings.iter().all(|row| row.username == "Unknown"));
    }

    #[tokio::test]
    async fn invalid_rosters_are_rejected_before_any_write() {
        let (state, store) = setup().await;
        let user = Uuid::new_v4();
        let result = create_championship(&state, Uuid::new_v4(), request(vec![user, user])).await;
        assert!(matches!(result, Err(ServiceError::InvalidFixtureInput(_))));
        assert!(store.list_championships().await.unwrap().is_empty());

        let missing_mode = CreateChampionshipRequest {
            game_mode_id: Some(Uuid::new_v4()),
            ..request(vec![Uuid::new_v4(), Uuid::new_v4()])
        };
        assert!(matches!(
            create_championship(&state, Uuid::new_v4(), missing_mode).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn standings_follow_completed_results() {
        let (state, store) = setup().await;
        let roster: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let summary = create_championship(&state, Uuid::new_v4(), request(roster))
            .await
            .unwrap();
        let matches = store.list_matches(summary.id).await.unwrap();
        let first = &matches[0];
        match_service::override_result(&state, first.id, 4, 2)
            .await
            .unwrap();

        let detail = championship_detail(&state, summary.id).await.unwrap();
        assert_eq!(detail.standings[0].user_id, first.player1_id);
        assert_eq!(detail.standings[0].points, 3);
        assert_eq!(detail.standings[0].rounds_won, 4);
    }

    #[tokio::test]
    async fn championships_are_listed_newest_first_and_deletable() {
        let (state, _store) = setup().await;
        let pair = || request(vec![Uuid::new_v4(), Uuid::new_v4()]);
        let older = create_championship(&state, Uuid::new_v4(), pair())
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newer = create_championship(&state, Uuid::new_v4(), pair())
            .await
            .unwrap();

        let listed = list_championships(&state).await.unwrap();
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[1].id, older.id);

        delete_championship(&state, older.id).await.unwrap();
        assert!(matches!(
            delete_championship(&state, older.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(list_championships(&state).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn metrics_cover_the_whole_roster() {
        let (state, _store) = setup().await;
        let roster: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let summary = create_championship(&state, Uuid::new_v4(), request(roster.clone()))
            .await
            .unwrap();
        let metrics = championship_metrics(&state, summary.id).await.unwrap();
        assert_eq!(metrics.players.len(), 4);
        assert!(metrics.players.iter().all(|p| p.total_rounds == 0));
    }
}
