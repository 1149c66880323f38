use std::{error::Error, sync::Arc};

use futures::future::BoxFuture;
use thiserror::Error;

use super::{Coordinate, Region};

/// Area a target must be drawn from.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionBounds {
    /// Predefined landmass areas covering the whole world.
    World,
    /// Circles of a custom game mode; never empty.
    Regions(Arc<[Region]>),
}

impl RegionBounds {
    /// Bounds for a mode's region list, treating an empty list as the whole world.
    pub fn from_regions(regions: &[Region]) -> Self {
        if regions.is_empty() {
            RegionBounds::World
        } else {
            RegionBounds::Regions(Arc::from(regions))
        }
    }
}

/// Failures raised while looking for a playable coordinate.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Every sampling attempt came back without usable imagery.
    #[error("no location with imagery found after {attempts} attempts")]
    Unavailable { attempts: u32 },
    /// The imagery provider could not be queried at all.
    #[error("imagery provider request failed: {message}")]
    Provider {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

/// Source of verified target coordinates and geodesic distances.
pub trait GeoProvider: Send + Sync {
    /// Draw a coordinate inside `bounds` that has street-level imagery, retrying internally up
    /// to the provider's attempt ceiling.
    fn sample_valid_coordinate(
        &self,
        bounds: RegionBounds,
    ) -> BoxFuture<'static, Result<Coordinate, GeoError>>;

    /// Great-circle distance in kilometers.
    fn distance_km(&self, a: Coordinate, b: Coordinate) -> f64 {
        super::distance_km(a, b)
    }
}
