//! Offline candidate sampling over predefined landmass boxes and custom region circles.

use futures::future::BoxFuture;
use rand::{Rng, seq::IndexedRandom};

use super::{Coordinate, GeoError, GeoProvider, Region, RegionBounds};

/// Latitude/longitude box with reasonable street-level coverage.
#[derive(Debug, Clone, Copy)]
pub struct LandmassArea {
    pub name: &'static str,
    pub lat_range: (f64, f64),
    pub lng_range: (f64, f64),
}

/// Boxes sampled when a game has no custom regions.
pub const PREDEFINED_AREAS: &[LandmassArea] = &[
    LandmassArea {
        name: "western-europe",
        lat_range: (43.0, 53.0),
        lng_range: (-4.0, 15.0),
    },
    LandmassArea {
        name: "iberia",
        lat_range: (37.0, 43.0),
        lng_range: (-9.0, 3.0),
    },
    LandmassArea {
        name: "scandinavia",
        lat_range: (56.0, 64.0),
        lng_range: (5.0, 25.0),
    },
    LandmassArea {
        name: "eastern-europe",
        lat_range: (45.0, 54.0),
        lng_range: (15.0, 30.0),
    },
    LandmassArea {
        name: "united-kingdom",
        lat_range: (50.5, 56.0),
        lng_range: (-5.0, 1.5),
    },
    LandmassArea {
        name: "us-east",
        lat_range: (33.0, 43.0),
        lng_range: (-90.0, -74.0),
    },
    LandmassArea {
        name: "us-west",
        lat_range: (34.0, 47.0),
        lng_range: (-123.0, -110.0),
    },
    LandmassArea {
        name: "canada-south",
        lat_range: (43.5, 50.0),
        lng_range: (-80.0, -65.0),
    },
    LandmassArea {
        name: "mexico",
        lat_range: (17.0, 25.0),
        lng_range: (-105.0, -97.0),
    },
    LandmassArea {
        name: "southern-brazil",
        lat_range: (-30.0, -20.0),
        lng_range: (-54.0, -43.0),
    },
    LandmassArea {
        name: "pampas",
        lat_range: (-38.0, -31.0),
        lng_range: (-64.0, -57.0),
    },
    LandmassArea {
        name: "central-chile",
        lat_range: (-40.0, -33.0),
        lng_range: (-73.0, -71.0),
    },
    LandmassArea {
        name: "japan",
        lat_range: (33.0, 39.0),
        lng_range: (131.0, 141.0),
    },
    LandmassArea {
        name: "south-korea",
        lat_range: (34.8, 37.8),
        lng_range: (126.5, 129.3),
    },
    LandmassArea {
        name: "southeast-asia",
        lat_range: (13.0, 19.0),
        lng_range: (98.0, 104.0),
    },
    LandmassArea {
        name: "south-africa",
        lat_range: (-34.0, -25.0),
        lng_range: (18.0, 31.0),
    },
    LandmassArea {
        name: "australia-east",
        lat_range: (-38.0, -27.0),
        lng_range: (145.0, 153.0),
    },
    LandmassArea {
        name: "new-zealand",
        lat_range: (-46.0, -36.0),
        lng_range: (168.0, 178.0),
    },
];

/// Draw one unverified candidate inside `bounds`.
///
/// Region circles are sampled uniformly by area: a random region, a random bearing and a
/// distance of `radius * sqrt(u)`.
pub fn sample_candidate<R: Rng + ?Sized>(bounds: &RegionBounds, rng: &mut R) -> Coordinate {
    match bounds {
        RegionBounds::World => {
            let area = PREDEFINED_AREAS
                .choose(rng)
                .copied()
                .unwrap_or(PREDEFINED_AREAS[0]);
            Coordinate {
                lat: rng.random_range(area.lat_range.0..area.lat_range.1),
                lng: rng.random_range(area.lng_range.0..area.lng_range.1),
            }
        }
        RegionBounds::Regions(regions) => match regions.choose(rng) {
            Some(region) => sample_in_region(region, rng),
            None => sample_candidate(&RegionBounds::World, rng),
        },
    }
}

fn sample_in_region<R: Rng + ?Sized>(region: &Region, rng: &mut R) -> Coordinate {
    let bearing = rng.random_range(0.0..360.0);
    let distance = region.radius_km() * rng.random::<f64>().sqrt();
    region.center.destination(bearing, distance)
}

/// Provider that trusts every sampled candidate; used offline and in tests.
#[derive(Debug, Clone, Default)]
pub struct SamplingProvider;

impl GeoProvider for SamplingProvider {
    fn sample_valid_coordinate(
        &self,
        bounds: RegionBounds,
    ) -> BoxFuture<'static, Result<Coordinate, GeoError>> {
        let candidate = sample_candidate(&bounds, &mut rand::rng());
        Box::pin(async move { Ok(candidate) })
    }
}
