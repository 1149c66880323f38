//! DTOs for custom game modes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::GameModeEntity,
    dto::format_system_time,
    geo::{Coordinate, Region},
    scoring::ScoringMode,
};

/// Circle of a game mode as sent by clients.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema, Validate)]
pub struct RegionInput {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    #[validate(range(exclusive_min = 0.0, message = "radius must be a positive number of meters"))]
    pub radius_m: f64,
}

impl From<RegionInput> for Region {
    fn from(input: RegionInput) -> Self {
        Region {
            center: Coordinate::new(input.lat, input.lng),
            radius_m: input.radius_m,
        }
    }
}

/// Payload creating or replacing a game mode.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GameModeRequest {
    #[validate(length(min = 1, max = 80, message = "name must be 1 to 80 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: Option<String>,
    /// Empty means the whole world.
    #[serde(default)]
    #[validate(nested)]
    pub regions: Vec<RegionInput>,
}

/// Game mode as exposed to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameModeSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: String,
    pub regions: Vec<Region>,
    /// Relative scoring formula tournament rounds in this mode use.
    pub scoring: ScoringMode,
}

impl From<&GameModeEntity> for GameModeSummary {
    fn from(entity: &GameModeEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name.clone(),
            description: entity.description.clone(),
            created_by: entity.created_by,
            created_at: format_system_time(entity.created_at),
            regions: entity.regions.clone(),
            scoring: ScoringMode::relative_for(&entity.regions),
        }
    }
}
