//! Match completion: rounds-won tally, result derivation and participant deltas.
//!
//! Stores call [`evaluate`] inside their completion transaction; the functions here never touch
//! persistence themselves.

use std::collections::HashMap;

use uuid::Uuid;

use crate::dao::models::{
    GuessEntity, MatchEntity, MatchStatus, ParticipantEntity, PlayContext,
};
use crate::state::match_progress::ROUNDS_PER_MATCH;

/// Final result of a match, from player 1's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Player1Win,
    Player2Win,
    Draw,
}

impl MatchResult {
    /// Result implied by the rounds-won tally.
    pub fn from_rounds_won(player1: u8, player2: u8) -> Self {
        match player1.cmp(&player2) {
            std::cmp::Ordering::Greater => MatchResult::Player1Win,
            std::cmp::Ordering::Less => MatchResult::Player2Win,
            std::cmp::Ordering::Equal => MatchResult::Draw,
        }
    }

    /// Result recorded on a completed match, `None` while it is pending.
    pub fn of(match_entity: &MatchEntity) -> Option<Self> {
        match_entity.is_completed().then(|| {
            Self::from_rounds_won(
                match_entity.player1_rounds_won,
                match_entity.player2_rounds_won,
            )
        })
    }

    /// Aggregate changes for (player 1, player 2).
    pub fn deltas(self) -> (ParticipantDelta, ParticipantDelta) {
        match self {
            MatchResult::Player1Win => (ParticipantDelta::WIN, ParticipantDelta::LOSS),
            MatchResult::Player2Win => (ParticipantDelta::LOSS, ParticipantDelta::WIN),
            MatchResult::Draw => (ParticipantDelta::DRAW, ParticipantDelta::DRAW),
        }
    }
}

/// Change to one participant's aggregates caused by one finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantDelta {
    /// Standings points: 3 for a win, 1 for a draw.
    pub points: u32,
    /// 1 when the participant won the match.
    pub wins: u32,
    /// 1 when the match was drawn.
    pub draws: u32,
    /// 1 when the participant lost the match.
    pub losses: u32,
}

impl ParticipantDelta {
    /// Winner's share.
    pub const WIN: Self = Self {
        points: 3,
        wins: 1,
        draws: 0,
        losses: 0,
    };
    /// Each side of a draw.
    pub const DRAW: Self = Self {
        points: 1,
        wins: 0,
        draws: 1,
        losses: 0,
    };
    /// Loser's share.
    pub const LOSS: Self = Self {
        points: 0,
        wins: 0,
        draws: 0,
        losses: 1,
    };

    /// Add this delta (and one played match) to `participant`.
    pub fn apply(&self, participant: &mut ParticipantEntity) {
        participant.points += self.points;
        participant.wins += self.wins;
        participant.draws += self.draws;
        participant.losses += self.losses;
        participant.matches_played += 1;
    }

    /// Undo a previous [`apply`](Self::apply).
    pub fn revert(&self, participant: &mut ParticipantEntity) {
        participant.points = participant.points.saturating_sub(self.points);
        participant.wins = participant.wins.saturating_sub(self.wins);
        participant.draws = participant.draws.saturating_sub(self.draws);
        participant.losses = participant.losses.saturating_sub(self.losses);
        participant.matches_played = participant.matches_played.saturating_sub(1);
    }
}

/// Outcome of inspecting a match's guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Both players finished; the tally is final.
    Ready {
        player1_rounds_won: u8,
        player2_rounds_won: u8,
    },
    /// At least one player still has rounds to play.
    NotReady {
        player1_rounds: u8,
        player2_rounds: u8,
    },
}

/// Inspect the guesses of a match and decide whether it can be finalised.
///
/// Guesses from other contexts or other users are ignored. A round is won by the player whose
/// score is strictly higher; equal scores give the round to nobody.
pub fn evaluate(match_entity: &MatchEntity, guesses: &[GuessEntity]) -> Evaluation {
    let context = PlayContext::Match(match_entity.id);
    let mut scores: HashMap<(Uuid, u8), f64> = HashMap::new();
    for guess in guesses.iter().filter(|guess| guess.context == context) {
        if match_entity.involves(guess.user_id)
            && (1..=ROUNDS_PER_MATCH).contains(&guess.round_number)
        {
            scores.entry((guess.user_id, guess.round_number)).or_insert(guess.score);
        }
    }

    let rounds_of = |user: Uuid| {
        (1..=ROUNDS_PER_MATCH)
            .filter(|round| scores.contains_key(&(user, *round)))
            .count() as u8
    };
    let player1_rounds = rounds_of(match_entity.player1_id);
    let player2_rounds = rounds_of(match_entity.player2_id);

    if player1_rounds < ROUNDS_PER_MATCH || player2_rounds < ROUNDS_PER_MATCH {
        return Evaluation::NotReady {
            player1_rounds,
            player2_rounds,
        };
    }

    let mut player1_rounds_won = 0;
    let mut player2_rounds_won = 0;
    for round in 1..=ROUNDS_PER_MATCH {
        let first = scores[&(match_entity.player1_id, round)];
        let second = scores[&(match_entity.player2_id, round)];
        if first > second {
            player1_rounds_won += 1;
        } else if second > first {
            player2_rounds_won += 1;
        }
    }

    Evaluation::Ready {
        player1_rounds_won,
        player2_rounds_won,
    }
}

/// Record a final tally on `match_entity` and update both participants.
///
/// A match that was already completed has its previous deltas reverted first, so calling this
/// with a new tally overrides the old result instead of stacking on top of it.
pub fn finalize(
    match_entity: &mut MatchEntity,
    participants: &mut [ParticipantEntity],
    player1_rounds_won: u8,
    player2_rounds_won: u8,
) {
    if let Some(previous) = MatchResult::of(match_entity) {
        apply_to_players(match_entity, participants, previous, ParticipantDelta::revert);
    }

    match_entity.player1_rounds_won = player1_rounds_won;
    match_entity.player2_rounds_won = player2_rounds_won;
    match_entity.status = MatchStatus::Completed;

    let result = MatchResult::from_rounds_won(player1_rounds_won, player2_rounds_won);
    apply_to_players(match_entity, participants, result, ParticipantDelta::apply);
}

fn apply_to_players(
    match_entity: &MatchEntity,
    participants: &mut [ParticipantEntity],
    result: MatchResult,
    op: fn(&ParticipantDelta, &mut ParticipantEntity),
) {
    let (first, second) = result.deltas();
    for participant in participants
        .iter_mut()
        .filter(|p| p.championship_id == match_entity.championship_id)
    {
        if participant.user_id == match_entity.player1_id {
            op(&first, participant);
        } else if participant.user_id == match_entity.player2_id {
            op(&second, participant);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::geo::Coordinate;

    fn guess(match_id: Uuid, user_id: Uuid, round: u8, score: f64) -> GuessEntity {
        GuessEntity {
            id: Uuid::new_v4(),
            context: PlayContext::Match(match_id),
            user_id,
            round_number: round,
            guess: Some(Coordinate::new(0.0, 0.0)),
            target: Coordinate::new(1.0, 1.0),
            score,
            distance_km: Some(10.0),
            created_at: SystemTime::now(),
        }
    }

    fn pending_match() -> (MatchEntity, Vec<ParticipantEntity>) {
        let championship_id = Uuid::new_v4();
        let entity = MatchEntity {
            id: Uuid::new_v4(),
            championship_id,
            player1_id: Uuid::new_v4(),
            player2_id: Uuid::new_v4(),
            round_number: 1,
            status: MatchStatus::Pending,
            player1_rounds_won: 0,
            player2_rounds_won: 0,
        };
        let participants = vec![
            ParticipantEntity::new(championship_id, entity.player1_id),
            ParticipantEntity::new(championship_id, entity.player2_id),
        ];
        (entity, participants)
    }

    fn full_match(entity: &MatchEntity, p1: [f64; 6], p2: [f64; 6]) -> Vec<GuessEntity> {
        (1..=6u8)
            .flat_map(|round| {
                let i = usize::from(round - 1);
                [
                    guess(entity.id, entity.player1_id, round, p1[i]),
                    guess(entity.id, entity.player2_id, round, p2[i]),
                ]
            })
            .collect()
    }

    #[test]
    fn not_ready_until_both_players_finish() {
        let (entity, _) = pending_match();
        let mut guesses = full_match(&entity, [10.0; 6], [20.0; 6]);
        guesses.retain(|g| !(g.user_id == entity.player2_id && g.round_number == 6));
        assert_eq!(
            evaluate(&entity, &guesses),
            Evaluation::NotReady {
                player1_rounds: 6,
                player2_rounds: 5
            }
        );
    }

    #[test]
    fn equal_round_scores_are_won_by_nobody() {
        let (entity, _) = pending_match();
        let guesses = full_match(
            &entity,
            [50.0, 60.0, 10.0, 0.0, 30.0, 30.0],
            [40.0, 70.0, 10.0, 5.0, 20.0, 30.0],
        );
        assert_eq!(
            evaluate(&entity, &guesses),
            Evaluation::Ready {
                player1_rounds_won: 2,
                player2_rounds_won: 2
            }
        );
    }

    #[test]
    fn guesses_from_other_contexts_are_ignored() {
        let (entity, _) = pending_match();
        let mut guesses = full_match(&entity, [10.0; 6], [20.0; 6]);
        let stray = guess(Uuid::new_v4(), entity.player1_id, 1, 99.0);
        guesses.insert(0, stray);
        assert_eq!(
            evaluate(&entity, &guesses),
            Evaluation::Ready {
                player1_rounds_won: 0,
                player2_rounds_won: 6
            }
        );
    }

    #[test]
    fn finalize_awards_points_by_rounds_won() {
        let (mut entity, mut participants) = pending_match();
        finalize(&mut entity, &mut participants, 4, 1);
        assert_eq!(entity.status, MatchStatus::Completed);
        assert_eq!((participants[0].points, participants[0].wins), (3, 1));
        assert_eq!((participants[1].points, participants[1].losses), (0, 1));
        assert_eq!(participants[0].matches_played, 1);
        assert_eq!(participants[1].matches_played, 1);
    }

    #[test]
    fn draw_gives_one_point_each() {
        let (mut entity, mut participants) = pending_match();
        finalize(&mut entity, &mut participants, 3, 3);
        for participant in &participants {
            assert_eq!((participant.points, participant.draws), (1, 1));
        }
    }

    #[test]
    fn overriding_reverts_previous_result() {
        let (mut entity, mut participants) = pending_match();
        finalize(&mut entity, &mut participants, 5, 0);
        finalize(&mut entity, &mut participants, 1, 2);

        assert_eq!(MatchResult::of(&entity), Some(MatchResult::Player2Win));
        let first = &participants[0];
        let second = &participants[1];
        assert_eq!(
            (first.points, first.wins, first.losses, first.matches_played),
            (0, 0, 1, 1)
        );
        assert_eq!(
            (second.points, second.wins, second.losses, second.matches_played),
            (3, 1, 0, 1)
        );
    }
}
