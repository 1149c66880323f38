//! Championship statistics computed from match guesses.

use std::cmp::Ordering;

use uuid::Uuid;

use crate::{dao::models::GuessEntity, geo::Continent};

/// Scoring summary of one player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerMetrics {
    pub user_id: Uuid,
    pub average_score: f64,
    /// Mean distance of the guesses that were submitted; `None` if every round timed out.
    pub average_distance_km: Option<f64>,
    pub best_score: f64,
    pub total_rounds: u32,
}

/// Average performance of the roster on targets inside one continent.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinentPerformance {
    pub continent: Continent,
    /// Mean of the per-player averages, counting only players with a positive average.
    pub average_score: f64,
    /// Per-player average, in roster order. Zero when the player has no round there.
    pub players: Vec<(Uuid, f64)>,
}

/// Per-player metrics, in roster order.
pub fn player_metrics(roster: &[Uuid], guesses: &[GuessEntity]) -> Vec<PlayerMetrics> {
    roster
        .iter()
        .map(|user_id| {
            let own: Vec<&GuessEntity> = guesses.iter().filter(|g| g.user_id == *user_id).collect();
            let distances: Vec<f64> = own.iter().filter_map(|g| g.distance_km).collect();
            PlayerMetrics {
                user_id: *user_id,
                average_score: mean(own.iter().map(|g| g.score)).unwrap_or(0.0),
                average_distance_km: mean(distances.into_iter()),
                best_score: own.iter().map(|g| g.score).fold(0.0, f64::max),
                total_rounds: own.len() as u32,
            }
        })
        .collect()
}

/// Continent breakdown sorted by average score, best first.
pub fn continent_performance(
    roster: &[Uuid],
    guesses: &[GuessEntity],
) -> Vec<ContinentPerformance> {
    let mut rows: Vec<ContinentPerformance> = Continent::NAMED
        .iter()
        .map(|continent| {
            let players: Vec<(Uuid, f64)> = roster
                .iter()
                .map(|user_id| {
                    let average = mean(
                        guesses
                            .iter()
                            .filter(|g| {
                                g.user_id == *user_id && Continent::classify(g.target) == *continent
                            })
                            .map(|g| g.score),
                    )
                    .unwrap_or(0.0);
                    (*user_id, average)
                })
                .collect();
            let average_score =
                mean(players.iter().map(|(_, avg)| *avg).filter(|avg| *avg > 0.0)).unwrap_or(0.0);
            ContinentPerformance {
                continent: *continent,
                average_score,
                players,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.average_score
            .partial_cmp(&a.average_score)
            .unwrap_or(Ordering::Equal)
    });
    rows
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}
