//! Free-play rankings by period.

use std::{collections::HashMap, time::SystemTime};

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    calendar::{GameDay, one_month_before},
    dao::models::GuessEntity,
    dto::{
        championship::display_name,
        ranking::{RankingEntry, RankingPeriod, RankingResponse},
    },
    error::ServiceError,
    services::profile_service,
    state::SharedState,
};

/// Score line of one player before names are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    pub user_id: Uuid,
    pub score: f64,
    pub rounds_played: usize,
}

/// Ranking of free-play scores over `period`, best first.
pub async fn ranking(
    state: &SharedState,
    period: RankingPeriod,
) -> Result<RankingResponse, ServiceError> {
    let store = state.require_arena_store().await?;
    let since = period_start(period, OffsetDateTime::now_utc());
    let guesses = store.list_daily_guesses(since).await?;
    let tallies = rank(
        &guesses,
        period,
        state.config().average_ranking_min_rounds,
    );
    let names = profile_service::usernames(store.as_ref()).await?;

    Ok(RankingResponse {
        period,
        entries: tallies
            .into_iter()
            .enumerate()
            .map(|(index, tally)| RankingEntry {
                position: index + 1,
                user_id: tally.user_id,
                username: display_name(&names, tally.user_id),
                score: tally.score,
                rounds_played: tally.rounds_played,
            })
            .collect(),
    })
}

/// First instant counted by `period`; `None` means no lower bound.
pub fn period_start(period: RankingPeriod, now: OffsetDateTime) -> Option<SystemTime> {
    let start = match period {
        RankingPeriod::Daily => GameDay::containing(now).starts_at(),
        RankingPeriod::Weekly => now - Duration::days(7),
        RankingPeriod::Monthly => one_month_before(now),
        RankingPeriod::AllTime | RankingPeriod::Average => return None,
    };
    Some(start.into())
}

/// Sum (or, for [`RankingPeriod::Average`], average) the scores of each player.
///
/// The average ranking only lists players with at least `min_rounds` rounds.
pub fn rank(guesses: &[GuessEntity], period: RankingPeriod, min_rounds: usize) -> Vec<Tally> {
    let mut by_user: HashMap<Uuid, (f64, usize)> = HashMap::new();
    for guess in guesses {
        let entry = by_user.entry(guess.user_id).or_insert((0.0, 0));
        entry.0 += guess.score;
        entry.1 += 1;
    }

    let mut tallies: Vec<Tally> = by_user
        .into_iter()
        .filter_map(|(user_id, (total, rounds_played))| {
            if period == RankingPeriod::Average {
                (rounds_played >= min_rounds && rounds_played > 0).then(|| Tally {
                    user_id,
                    score: round2(total / rounds_played as f64),
                    rounds_played,
                })
            } else {
                Some(Tally {
                    user_id,
                    score: round2(total),
                    rounds_played,
                })
            }
        })
        .collect();

    tallies.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.rounds_played.cmp(&a.rounds_played))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    tallies
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::{dao::models::PlayContext, geo::Coordinate};

    fn guess(user_id: Uuid, round: u8, score: f64) -> GuessEntity {
        GuessEntity {
            id: Uuid::new_v4(),
            context: PlayContext::Daily(GameDay::today()),
            user_id,
            round_number: round,
            guess: Some(Coordinate::new(0.0, 0.0)),
            target: Coordinate::new(0.0, 1.0),
            score,
            distance_km: Some(111.0),
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn totals_are_sorted_best_first() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let guesses = vec![guess(a, 1, 40.0), guess(b, 1, 90.0), guess(a, 2, 30.5)];
        let ranked = rank(&guesses, RankingPeriod::Daily, 50);
        assert_eq!(ranked[0].user_id, b);
        assert_eq!(ranked[0].score, 90.0);
        assert_eq!(ranked[1].score, 70.5);
        assert_eq!(ranked[1].rounds_played, 2);
    }

    #[test]
    fn average_ranking_requires_enough_rounds() {
        let (veteran, newcomer) = (Uuid::new_v4(), Uuid::new_v4());
        let mut guesses: Vec<GuessEntity> = (0..3).map(|_| guess(veteran, 1, 60.0)).collect();
        guesses.push(guess(newcomer, 1, 100.0));

        let ranked = rank(&guesses, RankingPeriod::Average, 3);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].user_id, veteran);
        assert_eq!(ranked[0].score, 60.0);
    }

    #[test]
    fn period_starts() {
        let now = datetime!(2024-03-31 01:00 UTC);
        assert_eq!(
            period_start(RankingPeriod::Daily, now),
            Some(datetime!(2024-03-30 03:00 UTC).into())
        );
        assert_eq!(
            period_start(RankingPeriod::Weekly, now),
            Some(datetime!(2024-03-24 01:00 UTC).into())
        );
        assert_eq!(
            period_start(RankingPeriod::Monthly, now),
            Some(datetime!(2024-02-29 01:00 UTC).into())
        );
        assert_eq!(period_start(RankingPeriod::AllTime, now), None);
    }
}
