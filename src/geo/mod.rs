//! Geodesic primitives shared by target generation, scoring and metrics.

pub mod provider;
pub mod sampling;
#[cfg(feature = "streetview")]
pub mod streetview;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use self::provider::{GeoError, GeoProvider, RegionBounds};

/// Mean equatorial radius used by the imagery provider's spherical distance helper.
pub const EARTH_RADIUS_KM: f64 = 6378.137;

/// A WGS84 point expressed in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinate {
    /// Latitude in degrees, within `[-90, 90]`.
    pub lat: f64,
    /// Longitude in degrees, within `[-180, 180]`.
    pub lng: f64,
}

impl Coordinate {
    /// Build a coordinate from latitude and longitude degrees.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and inside their geographic range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Point reached when travelling `distance_km` from `self` along the initial `bearing_deg`.
    pub fn destination(&self, bearing_deg: f64, distance_km: f64) -> Coordinate {
        let delta = distance_km / EARTH_RADIUS_KM;
        let theta = bearing_deg.to_radians();
        let lat1 = self.lat.to_radians();
        let lng1 = self.lng.to_radians();

        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
        let lng2 = lng1
            + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

        Coordinate {
            lat: lat2.to_degrees(),
            lng: normalize_lng(lng2.to_degrees()),
        }
    }
}

/// Circular area constraining target sampling for a custom game mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Region {
    /// Center of the circle.
    pub center: Coordinate,
    /// Radius in meters.
    pub radius_m: f64,
}

impl Region {
    /// Radius converted to kilometers.
    pub fn radius_km(&self) -> f64 {
        self.radius_m / 1000.0
    }
}

/// Great-circle (haversine) distance between two points, in kilometers.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = lat2 - lat1;
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Half of the widest internal distance of a region set, radii included.
///
/// A single region spans its own diameter, so its threshold equals its radius. An empty set has
/// no threshold: callers fall back to the fixed distance ladder.
pub fn score_threshold_km(regions: &[Region]) -> Option<f64> {
    match regions {
        [] => None,
        [single] => Some(single.radius_km()),
        _ => {
            let mut widest: f64 = 0.0;
            for (i, a) in regions.iter().enumerate() {
                for b in &regions[i + 1..] {
                    let span = distance_km(a.center, b.center) + a.radius_km() + b.radius_km();
                    widest = widest.max(span);
                }
            }
            Some(widest / 2.0)
        }
    }
}

fn normalize_lng(lng: f64) -> f64 {
    let wrapped = (lng + 540.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 { 180.0 } else { wrapped }
}

/// Coarse continent buckets used by championship metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Continent {
    NorthAmerica,
    SouthAmerica,
    Europe,
    Africa,
    Asia,
    Oceania,
    Other,
}

impl Continent {
    /// Every named continent, in display order. [`Continent::Other`] is excluded.
    pub const NAMED: [Continent; 6] = [
        Continent::NorthAmerica,
        Continent::SouthAmerica,
        Continent::Europe,
        Continent::Africa,
        Continent::Asia,
        Continent::Oceania,
    ];

    /// Classify a point with overlapping bounding boxes; the first match wins.
    pub fn classify(point: Coordinate) -> Continent {
        let Coordinate { lat, lng } = point;
        if lat > 7.0 && lat < 85.0 && lng > -170.0 && lng < -50.0 {
            Continent::NorthAmerica
        } else if lat > -60.0 && lat < 15.0 && lng > -90.0 && lng < -30.0 {
            Continent::SouthAmerica
        } else if lat > 35.0 && lat < 72.0 && lng > -25.0 && lng < 45.0 {
            Continent::Europe
        } else if lat > -35.0 && lat < 38.0 && lng > -20.0 && lng < 52.0 {
            Continent::Africa
        } else if lat > -10.0 && lat < 80.0 && lng > 25.0 && lng < 180.0 {
            Continent::Asia
        } else if lat > -50.0 && lat < 0.0 && lng > 110.0 && lng < 180.0 {
            Continent::Oceania
        } else {
            Continent::Other
        }
    }
}
