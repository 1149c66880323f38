//! Round scoring: absolute scoring with a time bonus for free play, relative scoring for
//! tournament and custom-region play.

use serde::Serialize;
use utoipa::ToSchema;

use crate::geo::{self, Coordinate, Region};

/// Highest score a round can award.
pub const MAX_SCORE: f64 = 100.0;
/// Guesses closer than this are perfect.
pub const PERFECT_RADIUS_KM: f64 = 0.5;

const ABSOLUTE_DISTANCE_WEIGHT: f64 = 90.0;
const ABSOLUTE_TIME_WEIGHT: f64 = 10.0;
const ABSOLUTE_MIN_DISTANCE_KM: f64 = 1.0;
const ABSOLUTE_MAX_DISTANCE_KM: f64 = 15_000.0;
const TIME_BONUS_CAP_SECS: f64 = 60.0;

/// Upper distance bound (km) and score of each rung of the fixed ladder.
const DISTANCE_LADDER: [(f64, f64); 7] = [
    (0.5, 100.0),
    (2.0, 90.0),
    (10.0, 80.0),
    (50.0, 60.0),
    (250.0, 40.0),
    (1_000.0, 20.0),
    (5_000.0, 5.0),
];

/// Formula used for every round of a session or match, chosen once up front.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringMode {
    /// Global scoring with a time bonus (free daily play).
    Absolute,
    /// Linear decay bounded by a custom region set's spread.
    Tiered {
        /// Distance at which the score reaches zero.
        threshold_km: f64,
    },
    /// Fixed distance ladder, used when no custom region applies.
    Ladder,
}

impl ScoringMode {
    /// Relative mode for a region set: tiered when the set defines a threshold, ladder otherwise.
    pub fn relative_for(regions: &[Region]) -> Self {
        match geo::score_threshold_km(regions) {
            Some(threshold_km) if threshold_km > 0.0 => ScoringMode::Tiered { threshold_km },
            _ => ScoringMode::Ladder,
        }
    }
}

/// Score split between its distance and time components.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, ToSchema)]
pub struct ScoreBreakdown {
    /// Points earned for proximity to the target.
    pub distance: f64,
    /// Bonus for time left on the clock; always 0 outside free play.
    pub time: f64,
}

/// Outcome of scoring a single round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct RoundScore {
    /// Total in `[0, 100]`, rounded to two decimals.
    pub total: f64,
    /// Distance to the target; `None` when no guess was submitted.
    pub distance_km: Option<f64>,
    pub breakdown: ScoreBreakdown,
}

impl RoundScore {
    /// Score of a round that ended without a guess.
    pub const fn timeout() -> Self {
        Self {
            total: 0.0,
            distance_km: None,
            breakdown: ScoreBreakdown {
                distance: 0.0,
                time: 0.0,
            },
        }
    }
}

/// Score a guess against its target.
pub fn score_round(
    mode: ScoringMode,
    target: Coordinate,
    guess: Option<Coordinate>,
    time_left_secs: f64,
) -> RoundScore {
    match guess {
        Some(guess) => score_distance(mode, geo::distance_km(target, guess), time_left_secs),
        None => RoundScore::timeout(),
    }
}

/// Score an already measured distance.
pub fn score_distance(mode: ScoringMode, distance_km: f64, time_left_secs: f64) -> RoundScore {
    let distance_km = if distance_km.is_finite() {
        distance_km.max(0.0)
    } else {
        f64::MAX
    };

    let (distance, time) = match mode {
        ScoringMode::Absolute => absolute_components(distance_km, time_left_secs),
        ScoringMode::Tiered { threshold_km } => (tiered_component(distance_km, threshold_km), 0.0),
        ScoringMode::Ladder => (ladder_component(distance_km), 0.0),
    };

    RoundScore {
        total: round2((distance + time).clamp(0.0, MAX_SCORE)),
        distance_km: Some(distance_km),
        breakdown: ScoreBreakdown {
            distance: round2(distance),
            time: round2(time),
        },
    }
}

fn absolute_components(distance_km: f64, time_left_secs: f64) -> (f64, f64) {
    if distance_km <= PERFECT_RADIUS_KM {
        return (ABSOLUTE_DISTANCE_WEIGHT, ABSOLUTE_TIME_WEIGHT);
    }

    let distance = if distance_km <= ABSOLUTE_MIN_DISTANCE_KM {
        ABSOLUTE_DISTANCE_WEIGHT
    } else if distance_km < ABSOLUTE_MAX_DISTANCE_KM {
        ABSOLUTE_DISTANCE_WEIGHT
            * (1.0
                - (distance_km - ABSOLUTE_MIN_DISTANCE_KM)
                    / (ABSOLUTE_MAX_DISTANCE_KM - ABSOLUTE_MIN_DISTANCE_KM))
    } else {
        0.0
    };

    let time_left = if time_left_secs.is_finite() {
        time_left_secs.clamp(0.0, TIME_BONUS_CAP_SECS)
    } else {
        0.0
    };
    let time = time_left / TIME_BONUS_CAP_SECS * ABSOLUTE_TIME_WEIGHT;

    (distance.clamp(0.0, ABSOLUTE_DISTANCE_WEIGHT), time)
}

fn tiered_component(distance_km: f64, threshold_km: f64) -> f64 {
    if threshold_km > 0.0 && distance_km < threshold_km {
        MAX_SCORE * (1.0 - distance_km / threshold_km)
    } else {
        0.0
    }
}

fn ladder_component(distance_km: f64) -> f64 {
    DISTANCE_LADDER
        .iter()
        .find(|(limit, _)| distance_km <= *limit)
        .map(|(_, score)| *score)
        .unwrap_or(0.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
