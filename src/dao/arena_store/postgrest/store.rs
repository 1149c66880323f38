use std::{sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
    calendar::GameDay,
    dao::{
        arena_store::ArenaStore,
        models::{
            ChampionshipDraft, ChampionshipEntity, CompletionOutcome, GameModeEntity, GuessEntity,
            MatchEntity, MatchRoundEntity, ParticipantEntity, PlayContext, ProfileEntity,
        },
        storage::{StorageResult, WriteOutcome},
    },
    geo::Coordinate,
};

use super::{
    config::PostgrestConfig,
    error::{PostgrestDaoError, PostgrestResult},
    models::{
        AppendDailyLocationArgs, CHAMPIONSHIPS, ChampionshipIdArgs, ChampionshipRow,
        CompletionReply, CreateChampionshipArgs, DAILY_LOCATIONS, DailyLocationsRow, GAME_MODES,
        GameModeRow, GuessRow, MATCH_GUESSES, MATCH_ROUND_KEY, MATCH_ROUNDS, MATCHES, MatchIdArgs, MatchRoundRow,
        MatchRow, PARTICIPANTS, PROFILES, ProfileRow, SCORES, UpdateMatchResultArgs,
        format_timestamp,
    },
};

const REST_PREFIX: &str = "rest/v1";
const IGNORE_DUPLICATES: &str = "resolution=ignore-duplicates,return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=minimal";

type Filters = Vec<(&'static str, String)>;

#[derive(Clone)]
pub struct PostgrestArenaStore {
    client: Client,
    base_url: Arc<str>,
    api_key: Option<Arc<str>>,
}

impl PostgrestArenaStore {
    /// Build the HTTP client and make sure the gateway answers.
    pub async fn connect(config: PostgrestConfig) -> PostgrestResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| PostgrestDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
            api_key: config.api_key.map(Arc::<str>::from),
        };
        store.ping().await?;
        Ok(store)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, REST_PREFIX, path);
        let builder = self.client.request(method, url);
        match self.api_key {
            Some(ref key) => builder
                .header("apikey", key.as_ref())
                .bearer_auth(key.as_ref()),
            None => builder,
        }
    }

    async fn send(&self, path: &str, builder: RequestBuilder) -> PostgrestResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| PostgrestDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(PostgrestDaoError::RequestStatus {
                path: path.to_string(),
                status,
                body,
            })
        }
    }

    async fn decode<T>(path: &str, response: Response) -> PostgrestResult<T>
    where
        T: DeserializeOwned,
    {
        response
            .json::<T>()
            .await
            .map_err(|source| PostgrestDaoError::DecodeResponse {
                path: path.to_string(),
                source,
            })
    }

    async fn ping(&self) -> PostgrestResult<()> {
        self.send(REST_PREFIX, self.request(Method::GET, ""))
            .await
            .map(|_| ())
    }

    async fn select<T>(&self, table: &str, filters: Filters) -> PostgrestResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut query = filters;
        query.push(("select", "*".to_string()));
        let response = self
            .send(table, self.request(Method::GET, table).query(&query))
            .await?;
        Self::decode(table, response).await
    }

    async fn select_one<T>(&self, table: &str, filters: Filters) -> PostgrestResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        Ok(self.select(table, filters).await?.into_iter().next())
    }

    /// Insert unless a row with the same `on_conflict` key exists. PostgREST echoes back only
    /// the rows it actually wrote.
    async fn insert_if_absent<T>(
        &self,
        table: &str,
        on_conflict: &str,
        row: &T,
    ) -> PostgrestResult<WriteOutcome>
    where
        T: ?Sized + Serialize,
    {
        let builder = self
            .request(Method::POST, table)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", IGNORE_DUPLICATES)
            .json(row);
        let response = self.send(table, builder).await?;
        let written: Vec<serde_json::Value> = Self::decode(table, response).await?;
        Ok(if written.is_empty() {
            WriteOutcome::Conflict
        } else {
            WriteOutcome::Written
        })
    }

    async fn upsert<T>(&self, table: &str, row: &T) -> PostgrestResult<()>
    where
        T: ?Sized + Serialize,
    {
        let builder = self
            .request(Method::POST, table)
            .header("Prefer", MERGE_DUPLICATES)
            .json(row);
        self.send(table, builder).await.map(|_| ())
    }

    /// Delete matching rows; reports whether any row went away.
    async fn delete(&self, table: &str, filters: Filters) -> PostgrestResult<bool> {
        let builder = self
            .request(Method::DELETE, table)
            .header("Prefer", "return=representation")
            .query(&filters);
        let response = self.send(table, builder).await?;
        let removed: Vec<serde_json::Value> = Self::decode(table, response).await?;
        Ok(!removed.is_empty())
    }

    async fn rpc<A, T>(&self, procedure: &str, args: &A) -> PostgrestResult<T>
    where
        A: Serialize,
        T: DeserializeOwned,
    {
        let path = format!("rpc/{procedure}");
        let response = self
            .send(&path, self.request(Method::POST, &path).json(args))
            .await?;
        Self::decode(&path, response).await
    }

    async fn rpc_void<A>(&self, procedure: &str, args: &A) -> PostgrestResult<()>
    where
        A: Serialize,
    {
        let path = format!("rpc/{procedure}");
        self.send(&path, self.request(Method::POST, &path).json(args))
            .await
            .map(|_| ())
    }

    async fn guesses(
        &self,
        table: &'static str,
        filters: Filters,
    ) -> PostgrestResult<Vec<GuessEntity>> {
        self.select::<GuessRow>(table, filters)
            .await?
            .into_iter()
            .map(|row| row.into_entity(table))
            .collect()
    }

    async fn matches(&self, filters: Filters) -> PostgrestResult<Vec<MatchEntity>> {
        self.select::<MatchRow>(MATCHES, filters)
            .await?
            .into_iter()
            .map(MatchRow::into_entity)
            .collect()
    }
}

fn eq(value: impl ToString) -> String {
    format!("eq.{}", value.to_string())
}

impl ArenaStore for PostgrestArenaStore {
    fn find_daily_location(
        &self,
        day: GameDay,
        round: u8,
    ) -> BoxFuture<'static, StorageResult<Option<Coordinate>>> {
        let store = self.clone();
        Box::pin(async move {
            let row = store
                .select_one::<DailyLocationsRow>(DAILY_LOCATIONS, vec![("location_date", eq(day))])
                .await?;
            Ok(row.and_then(|row| {
                usize::from(round)
                    .checked_sub(1)
                    .and_then(|index| row.locations.get(index).copied())
            }))
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
            let args = AppendDailyLocationArgs {
                p_location_date: day,
                p_round_number: round,
                p_lat: target.lat,
                p_lng: target.lng,
            };
            let appended: bool = store.rpc("append_daily_location", &args).await?;
            Ok(if appended {
                WriteOutcome::Written
            } else {
                WriteOutcome::Conflict
            })
        })
    }

    fn find_match_round(
        &self,
        match_id: Uuid,
        round: u8,
    ) -> BoxFuture<'static, StorageResult<Option<Coordinate>>> {
        let store = self.clone();
        Box::pin(async move {
            let row = store
                .select_one::<MatchRoundRow>(
                    MATCH_ROUNDS,
                    vec![("match_id", eq(match_id)), ("round_number", eq(round))],
                )
                .await?;
            Ok(row.map(|row| Coordinate::new(row.lat, row.lng)))
        })
    }

    fn insert_match_round(
        &self,
        round: MatchRoundEntity,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            let row = MatchRoundRow::from(round);
            store
                .insert_if_absent(MATCH_ROUNDS, MATCH_ROUND_KEY, &row)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_guess(&self, guess: GuessEntity) -> BoxFuture<'static, StorageResult<WriteOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            let table = GuessRow::table_for(guess.context);
            let on_conflict = GuessRow::conflict_target(guess.context);
            let row = GuessRow::from(guess);
            store
                .insert_if_absent(table, on_conflict, &row)
                .await
                .map_err(Into::into)
        })
    }

    fn list_context_guesses(
        &self,
        context: PlayContext,
    ) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let table = GuessRow::table_for(context);
            let filter = match context {
                PlayContext::Daily(day) => ("location_date", eq(day)),
                PlayContext::Match(match_id) => ("match_id", eq(match_id)),
            };
            store.guesses(table, vec![filter]).await.map_err(Into::into)
        })
    }

    fn list_match_guesses(
        &self,
        match_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            if match_ids.is_empty() {
                return Ok(Vec::new());
            }
            let ids = match_ids
                .iter()
                .map(Uuid::to_string)
                .collect::<Vec<_>>()
                .join(",");
            store
                .guesses(MATCH_GUESSES, vec![("match_id", format!("in.({ids})"))])
                .await
                .map_err(Into::into)
        })
    }

    fn list_daily_guesses(
        &self,
        since: Option<SystemTime>,
    ) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let filters = since
                .map(|since| vec![("created_at", format!("gte.{}", format_timestamp(since)))])
                .unwrap_or_default();
            store.guesses(SCORES, filters).await.map_err(Into::into)
        })
    }

    fn create_championship(
        &self,
        draft: ChampionshipDraft,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let args = CreateChampionshipArgs {
                p_championship: ChampionshipRow::from(&draft.championship),
                p_participants: draft.participants,
                p_matches: draft.matches.iter().map(MatchRow::from).collect(),
            };
            store
                .rpc_void("create_championship", &args)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_championship(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let args = ChampionshipIdArgs {
                p_championship_id: id,
            };
            store
                .rpc("delete_championship", &args)
                .await
                .map_err(Into::into)
        })
    }

    fn find_championship(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ChampionshipEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let row = store
                .select_one::<ChampionshipRow>(CHAMPIONSHIPS, vec![("id", eq(id))])
                .await?;
            Ok(row.map(ChampionshipRow::into_entity).transpose()?)
        })
    }

    fn list_championships(&self) -> BoxFuture<'static, StorageResult<Vec<ChampionshipEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let rows = store
                .select::<ChampionshipRow>(CHAMPIONSHIPS, Vec::new())
                .await?;
            Ok(rows
                .into_iter()
                .map(ChampionshipRow::into_entity)
                .collect::<PostgrestResult<Vec<_>>>()?)
        })
    }

    fn list_participants(
        &self,
        championship_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .select(PARTICIPANTS, vec![("championship_id", eq(championship_id))])
                .await
                .map_err(Into::into)
        })
    }

    fn list_matches(
        &self,
        championship_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .matches(vec![
                    ("championship_id", eq(championship_id)),
                    ("order", "round_number.asc".to_string()),
                ])
                .await
                .map_err(Into::into)
        })
    }

    fn list_user_matches(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .matches(vec![(
                    "or",
                    format!("(player1_id.eq.{user_id},player2_id.eq.{user_id})"),
                )])
                .await
                .map_err(Into::into)
        })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .matches(vec![("id", eq(id))])
                .await?
                .into_iter()
                .next())
        })
    }

    fn complete_match(
        &self,
        match_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CompletionOutcome>>> {
        let store = self.clone();
        Box::pin(async move {
            let reply: CompletionReply = store
                .rpc(
                    "trigger_match_completion",
                    &MatchIdArgs {
                        p_match_id: match_id,
                    },
                )
                .await?;
            let outcome = match reply {
                CompletionReply::Completed { entity } => {
                    CompletionOutcome::Completed(entity.into_entity()?)
                }
                CompletionReply::AlreadyCompleted { entity } => {
                    CompletionOutcome::AlreadyCompleted(entity.into_entity()?)
                }
                CompletionReply::NotReady {
                    player1_rounds,
                    player2_rounds,
                } => CompletionOutcome::NotReady {
                    player1_rounds,
                    player2_rounds,
                },
                CompletionReply::NotFound => return Ok(None),
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
            let args = UpdateMatchResultArgs {
                p_match_id: match_id,
                p1_score: player1_rounds_won,
                p2_score: player2_rounds_won,
            };
            let row: Option<MatchRow> = store.rpc("update_match_result", &args).await?;
            Ok(row.map(MatchRow::into_entity).transpose()?)
        })
    }

    fn save_game_mode(&self, mode: GameModeEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let row = GameModeRow::from(mode);
            store.upsert(GAME_MODES, &row).await.map_err(Into::into)
        })
    }

    fn find_game_mode(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameModeEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let row = store
                .select_one::<GameModeRow>(GAME_MODES, vec![("id", eq(id))])
                .await?;
            Ok(row.map(GameModeRow::into_entity).transpose()?)
        })
    }

    fn list_game_modes(&self) -> BoxFuture<'static, StorageResult<Vec<GameModeEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let rows = store.select::<GameModeRow>(GAME_MODES, Vec::new()).await?;
            Ok(rows
                .into_iter()
                .map(GameModeRow::into_entity)
                .collect::<PostgrestResult<Vec<_>>>()?)
        })
    }

    fn delete_game_mode(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete(GAME_MODES, vec![("id", eq(id))])
                .await
                .map_err(Into::into)
        })
    }

    fn save_profile(&self, profile: ProfileEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let row = ProfileRow::from(profile);
            store.upsert(PROFILES, &row).await.map_err(Into::into)
        })
    }

    fn list_profiles(&self) -> BoxFuture<'static, StorageResult<Vec<ProfileEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let rows = store.select::<ProfileRow>(PROFILES, Vec::new()).await?;
            Ok(rows.into_iter().map(ProfileEntity::from).collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
