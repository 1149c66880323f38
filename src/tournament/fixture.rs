//! Round-robin fixture generation (circle method).

use std::{collections::HashSet, time::SystemTime};

use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{
    ChampionshipDraft, ChampionshipEntity, ChampionshipStatus, MatchEntity, MatchStatus,
    ParticipantEntity,
};

/// Reasons a roster cannot be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixtureError {
    #[error("a championship needs at least 2 participants, got {count}")]
    TooFewParticipants { count: usize },
    #[error("participant {0} is listed more than once")]
    DuplicateParticipant(Uuid),
}

/// One scheduled pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    /// Fixture round, starting at 1.
    pub round_number: u32,
    pub player1: Uuid,
    pub player2: Uuid,
}

/// Schedule every unordered pair of `participants` exactly once.
///
/// Even rosters play `N - 1` rounds. Odd rosters get a phantom seat and play `N` rounds; whoever
/// is paired with the phantom sits that round out, so the bye rotates through every player once.
/// The first seat is fixed and the others rotate one step per round. The fixed seat's home side
/// flips every round so home and away counts never differ by more than one.
pub fn round_robin(participants: &[Uuid]) -> Result<Vec<Pairing>, FixtureError> {
    validate_roster(participants)?;

    let mut seats: Vec<Option<Uuid>> = participants.iter().copied().map(Some).collect();
    if seats.len() % 2 == 1 {
        seats.push(None);
    }

    let seat_count = seats.len();
    let mut pairings = Vec::with_capacity(participants.len() * (participants.len() - 1) / 2);
    for round in 0..seat_count - 1 {
        for slot in 0..seat_count / 2 {
            let (home, away) = (seats[slot], seats[seat_count - 1 - slot]);
            let (Some(home), Some(away)) = (home, away) else {
                continue;
            };
            let (player1, player2) = if slot == 0 && round % 2 == 1 {
                (away, home)
            } else {
                (home, away)
            };
            pairings.push(Pairing {
                round_number: round as u32 + 1,
                player1,
                player2,
            });
        }
        seats[1..].rotate_right(1);
    }

    Ok(pairings)
}

fn validate_roster(participants: &[Uuid]) -> Result<(), FixtureError> {
    if participants.len() < 2 {
        return Err(FixtureError::TooFewParticipants {
            count: participants.len(),
        });
    }
    let mut seen = HashSet::with_capacity(participants.len());
    for id in participants {
        if !seen.insert(*id) {
            return Err(FixtureError::DuplicateParticipant(*id));
        }
    }
    Ok(())
}

/// Build every row written when a championship is created.
pub fn draft_championship(
    name: String,
    created_by: Uuid,
    game_mode_id: Option<Uuid>,
    participants: &[Uuid],
) -> Result<ChampionshipDraft, FixtureError> {
    let pairings = round_robin(participants)?;
    let championship = ChampionshipEntity {
        id: Uuid::new_v4(),
        name,
        created_by,
        created_at: SystemTime::now(),
        status: ChampionshipStatus::Active,
        game_mode_id,
    };

    let participants = participants
        .iter()
        .map(|user_id| ParticipantEntity::new(championship.id, *user_id))
        .collect();
    let matches = pairings
        .into_iter()
        .map(|pairing| MatchEntity {
            id: Uuid::new_v4(),
            championship_id: championship.id,
            player1_id: pairing.player1,
            player2_id: pairing.player2,
            round_number: pairing.round_number,
            status: MatchStatus::Pending,
            player1_rounds_won: 0,
            player2_rounds_won: 0,
        })
        .collect();

    Ok(ChampionshipDraft {
        championship,
        participants,
        matches,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use super::*;

    fn roster(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn unordered(p: &Pairing) -> (Uuid, Uuid) {
        if p.player1 < p.player2 {
            (p.player1, p.player2)
        } else {
            (p.player2, p.player1)
        }
    }

    #[test]
    fn four_players_need_six_matches_over_three_rounds() {
        let players = roster(4);
        let pairings = round_robin(&players).unwrap();

        assert_eq!(pairings.len(), 6);
        assert_eq!(pairings.iter().map(|p| p.round_number).max(), Some(3));
        let pairs: BTreeSet<_> = pairings.iter().map(unordered).collect();
        assert_eq!(pairs.len(), 6);
    }

    #[test]
    fn every_pair_meets_exactly_once() {
        for n in 2..=9 {
            let players = roster(n);
            let pairings = round_robin(&players).unwrap();
            assert_eq!(pairings.len(), n * (n - 1) / 2, "n = {n}");
            let pairs: BTreeSet<_> = pairings.iter().map(unordered).collect();
            assert_eq!(pairs.len(), pairings.len(), "n = {n}");
            assert!(pairings.iter().all(|p| p.player1 != p.player2));
        }
    }

    #[test]
    fn rounds_are_contiguous_and_nobody_plays_twice_per_round() {
        for n in 2..=9 {
            let players = roster(n);
            let pairings = round_robin(&players).unwrap();
            let expected_rounds = if n % 2 == 0 { n - 1 } else { n } as u32;
            let rounds: BTreeSet<u32> = pairings.iter().map(|p| p.round_number).collect();
            assert_eq!(rounds, (1..=expected_rounds).collect(), "n = {n}");

            for round in rounds {
                let mut seen = HashSet::new();
                for p in pairings.iter().filter(|p| p.round_number == round) {
                    assert!(seen.insert(p.player1));
                    assert!(seen.insert(p.player2));
                }
            }
        }
    }

    #[test]
    fn odd_rosters_give_each_player_one_bye() {
        let players = roster(5);
        let pairings = round_robin(&players).unwrap();
        for player in &players {
            let rounds_played: BTreeSet<u32> = pairings
                .iter()
                .filter(|p| p.player1 == *player || p.player2 == *player)
                .map(|p| p.round_number)
                .collect();
            assert_eq!(rounds_played.len(), 4);
        }
    }

    #[test]
    fn home_and_away_are_balanced() {
        for n in [4, 5, 6, 8] {
            let players = roster(n);
            let pairings = round_robin(&players).unwrap();
            let mut home: HashMap<Uuid, i32> = HashMap::new();
            let mut away: HashMap<Uuid, i32> = HashMap::new();
            for p in &pairings {
                *home.entry(p.player1).or_default() += 1;
                *away.entry(p.player2).or_default() += 1;
            }
            for player in &players {
                let diff = home.get(player).copied().unwrap_or(0)
                    - away.get(player).copied().unwrap_or(0);
                assert!(diff.abs() <= 1, "n = {n}, diff = {diff}");
            }
        }
    }

    #[test]
    fn fixture_is_deterministic() {
        let players = roster(7);
        assert_eq!(round_robin(&players), round_robin(&players));
    }

    #[test]
    fn invalid_rosters_are_rejected() {
        assert_eq!(
            round_robin(&roster(1)),
            Err(FixtureError::TooFewParticipants { count: 1 })
        );
        let id = Uuid::new_v4();
        assert_eq!(
            round_robin(&[id, Uuid::new_v4(), id]),
            Err(FixtureError::DuplicateParticipant(id))
        );
    }

    #[test]
    fn draft_links_rows_to_the_championship() {
        let players = roster(3);
        let creator = Uuid::new_v4();
        let draft = draft_championship("Spring cup".into(), creator, None, &players).unwrap();

        assert_eq!(draft.participants.len(), 3);
        assert_eq!(draft.matches.len(), 3);
        assert!(
            draft
                .matches
                .iter()
                .all(|m| m.championship_id == draft.championship.id
                    && m.status == MatchStatus::Pending)
        );
        assert!(draft.participants.iter().all(|p| p.points == 0));
        assert_eq!(draft.championship.created_by, creator);
    }
}
