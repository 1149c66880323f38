use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::{
    calendar::GameDay,
    dao::models::{
        ChampionshipEntity, ChampionshipStatus, GameModeEntity, GuessEntity, MatchEntity,
        MatchRoundEntity, MatchStatus, ParticipantEntity, PlayContext, ProfileEntity,
    },
    geo::{Coordinate, Region},
};

use super::error::{PostgrestDaoError, PostgrestResult};

pub const DAILY_LOCATIONS: &str = "daily_locations";
pub const MATCH_ROUNDS: &str = "match_rounds";
pub const SCORES: &str = "scores";
pub const MATCH_GUESSES: &str = "match_guesses";
pub const CHAMPIONSHIPS: &str = "championships";
pub const PARTICIPANTS: &str = "championship_participants";
pub const MATCHES: &str = "matches";
pub const GAME_MODES: &str = "game_modes";
pub const PROFILES: &str = "profiles";

/// Unique key `match_rounds` rows are deduplicated on.
pub const MATCH_ROUND_KEY: &str = "match_id,round_number";

/// Render an instant the way PostgREST expects `timestamptz` values.
pub fn format_timestamp(instant: SystemTime) -> String {
    OffsetDateTime::from(instant)
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::UNIX_EPOCH.to_string())
}

fn parse_timestamp(table: &'static str, value: &str) -> PostgrestResult<SystemTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map(SystemTime::from)
        .map_err(|_| PostgrestDaoError::InvalidRow {
            table,
            field: "created_at",
            value: value.to_owned(),
        })
}

fn point(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinate> {
    lat.zip(lng).map(|(lat, lng)| Coordinate::new(lat, lng))
}

fn round_number(table: &'static str, value: i32) -> PostgrestResult<u8> {
    u8::try_from(value).map_err(|_| PostgrestDaoError::InvalidRow {
        table,
        field: "round_number",
        value: value.to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct DailyLocationsRow {
    pub locations: Vec<Coordinate>,
}

#[derive(Debug, Serialize)]
pub struct AppendDailyLocationArgs {
    pub p_location_date: GameDay,
    pub p_round_number: u8,
    pub p_lat: f64,
    pub p_lng: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchRoundRow {
    pub match_id: Uuid,
    pub round_number: i32,
    pub lat: f64,
    pub lng: f64,
}

impl From<MatchRoundEntity> for MatchRoundRow {
    fn from(round: MatchRoundEntity) -> Self {
        Self {
            match_id: round.match_id,
            round_number: i32::from(round.round_number),
            lat: round.target.lat,
            lng: round.target.lng,
        }
    }
}

/// A guess row, stored in `scores` for daily play and in `match_guesses` for matches.
#[derive(Debug, Serialize, Deserialize)]
pub struct GuessRow {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_date: Option<GameDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_id: Option<Uuid>,
    pub user_id: Uuid,
    pub round_number: i32,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub target_lat: f64,
    pub target_lng: f64,
    pub score: f64,
    pub distance_km: Option<f64>,
    pub created_at: String,
}

impl GuessRow {
    /// Table holding guesses of `context`.
    pub fn table_for(context: PlayContext) -> &'static str {
        match context {
            PlayContext::Daily(_) => SCORES,
            PlayContext::Match(_) => MATCH_GUESSES,
        }
    }

    /// Unique key guesses of `context` are deduplicated on: one row per player and round.
    pub fn conflict_target(context: PlayContext) -> &'static str {
        match context {
            PlayContext::Daily(_) => "location_date,user_id,round_number",
            PlayContext::Match(_) => "match_id,user_id,round_number",
        }
    }

    pub fn into_entity(self, table: &'static str) -> PostgrestResult<GuessEntity> {
        let context = match (self.location_date, self.match_id) {
            (_, Some(match_id)) => PlayContext::Match(match_id),
            (Some(day), None) => PlayContext::Daily(day),
            (None, None) => {
                return Err(PostgrestDaoError::InvalidRow {
                    table,
                    field: "location_date",
                    value: "null".into(),
                });
            }
        };
        Ok(GuessEntity {
            id: self.id,
            context,
            user_id: self.user_id,
            round_number: round_number(table, self.round_number)?,
            guess: point(self.lat, self.lng),
            target: Coordinate::new(self.target_lat, self.target_lng),
            score: self.score,
            distance_km: self.distance_km,
            created_at: parse_timestamp(table, &self.created_at)?,
        })
    }
}

impl From<GuessEntity> for GuessRow {
    fn from(guess: GuessEntity) -> Self {
        let (location_date, match_id) = match guess.context {
            PlayContext::Daily(day) => (Some(day), None),
            PlayContext::Match(id) => (None, Some(id)),
        };
        Self {
            id: guess.id,
            location_date,
            match_id,
            user_id: guess.user_id,
            round_number: i32::from(guess.round_number),
            lat: guess.guess.map(|point| point.lat),
            lng: guess.guess.map(|point| point.lng),
            target_lat: guess.target.lat,
            target_lng: guess.target.lng,
            score: guess.score,
            distance_km: guess.distance_km,
            created_at: format_timestamp(guess.created_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChampionshipRow {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub created_at: String,
    pub status: ChampionshipStatus,
    pub game_mode_id: Option<Uuid>,
}

impl ChampionshipRow {
    pub fn into_entity(self) -> PostgrestResult<ChampionshipEntity> {
        Ok(ChampionshipEntity {
            id: self.id,
            name: self.name,
            created_by: self.created_by,
            created_at: parse_timestamp(CHAMPIONSHIPS, &self.created_at)?,
            status: self.status,
            game_mode_id: self.game_mode_id,
        })
    }
}

impl From<&ChampionshipEntity> for ChampionshipRow {
    fn from(entity: &ChampionshipEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name.clone(),
            created_by: entity.created_by,
            created_at: format_timestamp(entity.created_at),
            status: entity.status,
            game_mode_id: entity.game_mode_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateChampionshipArgs {
    pub p_championship: ChampionshipRow,
    pub p_participants: Vec<ParticipantEntity>,
    pub p_matches: Vec<MatchRow>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchRow {
    pub id: Uuid,
    pub championship_id: Uuid,
    pub player1_id: Uuid,
    pub player2_id: Uuid,
    pub round_number: u32,
    pub status: MatchStatus,
    pub player1_rounds_won: i32,
    pub player2_rounds_won: i32,
}

impl MatchRow {
    pub fn into_entity(self) -> PostgrestResult<MatchEntity> {
        let rounds_won = |value: i32| {
            u8::try_from(value).map_err(|_| PostgrestDaoError::InvalidRow {
                table: MATCHES,
                field: "rounds_won",
                value: value.to_string(),
            })
        };
        Ok(MatchEntity {
            id: self.id,
            championship_id: self.championship_id,
            player1_id: self.player1_id,
            player2_id: self.player2_id,
            round_number: self.round_number,
            status: self.status,
            player1_rounds_won: rounds_won(self.player1_rounds_won)?,
            player2_rounds_won: rounds_won(self.player2_rounds_won)?,
        })
    }
}

impl From<&MatchEntity> for MatchRow {
    fn from(entity: &MatchEntity) -> Self {
        Self {
            id: entity.id,
            championship_id: entity.championship_id,
            player1_id: entity.player1_id,
            player2_id: entity.player2_id,
            round_number: entity.round_number,
            status: entity.status,
            player1_rounds_won: i32::from(entity.player1_rounds_won),
            player2_rounds_won: i32::from(entity.player2_rounds_won),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateMatchResultArgs {
    pub p_match_id: Uuid,
    pub p1_score: u8,
    pub p2_score: u8,
}

#[derive(Debug, Serialize)]
pub struct MatchIdArgs {
    pub p_match_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ChampionshipIdArgs {
    pub p_championship_id: Uuid,
}

/// Reply of `trigger_match_completion`.
#[derive(Debug, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompletionReply {
    Completed {
        #[serde(rename = "match")]
        entity: MatchRow,
    },
    AlreadyCompleted {
        #[serde(rename = "match")]
        entity: MatchRow,
    },
    NotReady {
        player1_rounds: u8,
        player2_rounds: u8,
    },
    NotFound,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GameModeRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: String,
    pub regions: Vec<Region>,
}

impl GameModeRow {
    pub fn into_entity(self) -> PostgrestResult<GameModeEntity> {
        Ok(GameModeEntity {
            id: self.id,
            name: self.name,
            description: self.description,
            created_by: self.created_by,
            created_at: parse_timestamp(GAME_MODES, &self.created_at)?,
            regions: self.regions,
        })
    }
}

impl From<GameModeEntity> for GameModeRow {
    fn from(mode: GameModeEntity) -> Self {
        Self {
            id: mode.id,
            name: mode.name,
            description: mode.description,
            created_by: mode.created_by,
            created_at: format_timestamp(mode.created_at),
            regions: mode.regions,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: Uuid,
    pub username: String,
}

impl From<ProfileRow> for ProfileEntity {
    fn from(row: ProfileRow) -> Self {
        ProfileEntity {
            user_id: row.id,
            username: row.username,
        }
    }
}

impl From<ProfileEntity> for ProfileRow {
    fn from(profile: ProfileEntity) -> Self {
        Self {
            id: profile.user_id,
            username: profile.username,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_out_guesses_store_null_coordinates() {
        let entity = GuessEntity {
            id: Uuid::new_v4(),
            context: PlayContext::Daily("2025-05-04".parse().unwrap()),
            user_id: Uuid::new_v4(),
            round_number: 3,
            guess: None,
            target: Coordinate::new(10.0, 20.0),
            score: 0.0,
            distance_km: None,
            created_at: SystemTime::UNIX_EPOCH,
        };
        let row = GuessRow::from(entity.clone());
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["location_date"], "2025-05-04");
        assert!(json.get("match_id").is_none());
        assert!(json["lat"].is_null());

        let back = row.into_entity(SCORES).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn completion_replies_are_tagged_by_outcome() {
        let reply: CompletionReply = serde_json::from_value(serde_json::json!({
            "outcome": "not_ready",
            "player1_rounds": 6,
            "player2_rounds": 2
        }))
        .unwrap();
        assert!(matches!(
            reply,
            CompletionReply::NotReady {
                player1_rounds: 6,
                player2_rounds: 2
            }
        ));
    }

    #[test]
    fn postgres_timestamps_parse() {
        let row = ChampionshipRow {
            id: Uuid::new_v4(),
            name: "Cup".into(),
            created_by: Uuid::new_v4(),
            created_at: "2025-01-02T03:04:05.123456+00:00".into(),
            status: ChampionshipStatus::Active,
            game_mode_id: None,
        };
        assert!(row.into_entity().is_ok());
    }
}
