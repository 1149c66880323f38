//! Per-player round progression for matches and free daily play.
//!
//! Progress is never stored on its own: it is derived from the guess rows each time, so two
//! uncoordinated sessions always agree on it as long as they read the same store.

use std::collections::BTreeSet;

use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{GuessEntity, MatchEntity, PlayContext};

/// Rounds in every tournament match.
pub const ROUNDS_PER_MATCH: u8 = 6;

/// Rejections raised by the round progression rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("user is not a participant of this match")]
    NotAParticipant,
    #[error("round {round} was already played")]
    DuplicateGuess { round: u8 },
    #[error("round {requested} cannot be played before round {expected}")]
    OutOfOrder { requested: u8, expected: u8 },
    #[error("match is already completed")]
    MatchClosed,
    #[error("round {round} is outside 1..={limit}")]
    RoundOutOfRange { round: u8, limit: u8 },
}

/// Rounds one player has recorded in one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundProgress {
    /// Rounds already recorded.
    pub played: u8,
    /// Rounds available in the context.
    pub limit: u8,
}

impl RoundProgress {
    /// Progress derived from the rounds a player has guesses for.
    pub fn from_rounds<I>(rounds: I, limit: u8) -> Self
    where
        I: IntoIterator<Item = u8>,
    {
        let distinct: BTreeSet<u8> = rounds
            .into_iter()
            .filter(|round| (1..=limit).contains(round))
            .collect();
        Self {
            played: distinct.len() as u8,
            limit,
        }
    }

    /// Next round to play, `None` once every round is recorded.
    pub fn next_round(&self) -> Option<u8> {
        (self.played < self.limit).then_some(self.played + 1)
    }

    pub fn is_finished(&self) -> bool {
        self.played >= self.limit
    }

    /// Accept `round` only when it is exactly the next one.
    pub fn check(&self, round: u8) -> Result<(), ProgressError> {
        if round == 0 || round > self.limit {
            return Err(ProgressError::RoundOutOfRange {
                round,
                limit: self.limit,
            });
        }
        if round <= self.played {
            return Err(ProgressError::DuplicateGuess { round });
        }
        let expected = self.played + 1;
        if round > expected {
            return Err(ProgressError::OutOfOrder {
                requested: round,
                expected,
            });
        }
        Ok(())
    }

    /// Advance after a successful write.
    pub fn record(&mut self) {
        self.played = (self.played + 1).min(self.limit);
    }
}

/// Side of the fixture pairing a player sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    Player1,
    Player2,
}

/// Progress of both players of one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchProgress {
    pub match_id: Uuid,
    pub player1_id: Uuid,
    pub player2_id: Uuid,
    pub completed: bool,
    pub player1: RoundProgress,
    pub player2: RoundProgress,
}

impl MatchProgress {
    /// Derive progress from the match row and its guesses.
    pub fn from_guesses(match_entity: &MatchEntity, guesses: &[GuessEntity]) -> Self {
        let context = PlayContext::Match(match_entity.id);
        let rounds_of = |user: Uuid| {
            RoundProgress::from_rounds(
                guesses
                    .iter()
                    .filter(|guess| guess.context == context && guess.user_id == user)
                    .map(|guess| guess.round_number),
                ROUNDS_PER_MATCH,
            )
        };

        Self {
            match_id: match_entity.id,
            player1_id: match_entity.player1_id,
            player2_id: match_entity.player2_id,
            completed: match_entity.is_completed(),
            player1: rounds_of(match_entity.player1_id),
            player2: rounds_of(match_entity.player2_id),
        }
    }

    pub fn seat_of(&self, user_id: Uuid) -> Result<Seat, ProgressError> {
        if user_id == self.player1_id {
            Ok(Seat::Player1)
        } else if user_id == self.player2_id {
            Ok(Seat::Player2)
        } else {
            Err(ProgressError::NotAParticipant)
        }
    }

    pub fn progress_of(&self, seat: Seat) -> RoundProgress {
        match seat {
            Seat::Player1 => self.player1,
            Seat::Player2 => self.player2,
        }
    }

    /// Next round for `user_id`, `None` when they have played all six.
    pub fn next_round_for(&self, user_id: Uuid) -> Result<Option<u8>, ProgressError> {
        if self.completed {
            return Err(ProgressError::MatchClosed);
        }
        let seat = self.seat_of(user_id)?;
        Ok(self.progress_of(seat).next_round())
    }

    /// Validate a submission for `round` by `user_id`.
    pub fn check_submission(&self, user_id: Uuid, round: u8) -> Result<Seat, ProgressError> {
        let seat = self.seat_of(user_id)?;
        if self.completed {
            return Err(ProgressError::MatchClosed);
        }
        self.progress_of(seat).check(round)?;
        Ok(seat)
    }

    /// Both players reached the last round; completion evaluation should run.
    pub fn both_finished(&self) -> bool {
        self.player1.is_finished() && self.player2.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::{dao::models::MatchStatus, geo::Coordinate};

    fn pending_match() -> MatchEntity {
        MatchEntity {
            id: Uuid::new_v4(),
            championship_id: Uuid::new_v4(),
            player1_id: Uuid::new_v4(),
            player2_id: Uuid::new_v4(),
            round_number: 1,
            status: MatchStatus::Pending,
            player1_rounds_won: 0,
            player2_rounds_won: 0,
        }
    }

    fn guess(match_id: Uuid, user_id: Uuid, round: u8) -> GuessEntity {
        GuessEntity {
            id: Uuid::new_v4(),
            context: PlayContext::Match(match_id),
            user_id,
            round_number: round,
            guess: None,
            target: Coordinate::new(0.0, 0.0),
            score: 0.0,
            distance_km: None,
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn rounds_must_be_played_in_order() {
        let entity = pending_match();
        let guesses = vec![guess(entity.id, entity.player1_id, 1)];
        let progress = MatchProgress::from_guesses(&entity, &guesses);

        assert_eq!(
            progress.check_submission(entity.player1_id, 3),
            Err(ProgressError::OutOfOrder {
                requested: 3,
                expected: 2
            })
        );
        assert_eq!(
            progress.check_submission(entity.player1_id, 2),
            Ok(Seat::Player1)
        );
    }

    #[test]
    fn replaying_a_round_is_a_duplicate() {
        let entity = pending_match();
        let guesses = vec![
            guess(entity.id, entity.player2_id, 1),
            guess(entity.id, entity.player2_id, 2),
        ];
        let progress = MatchProgress::from_guesses(&entity, &guesses);
        assert_eq!(
            progress.check_submission(entity.player2_id, 2),
            Err(ProgressError::DuplicateGuess { round: 2 })
        );
    }

    #[test]
    fn strangers_and_closed_matches_are_rejected() {
        let mut entity = pending_match();
        let progress = MatchProgress::from_guesses(&entity, &[]);
        assert_eq!(
            progress.check_submission(Uuid::new_v4(), 1),
            Err(ProgressError::NotAParticipant)
        );

        entity.status = MatchStatus::Completed;
        let closed = MatchProgress::from_guesses(&entity, &[]);
        assert_eq!(
            closed.check_submission(entity.player1_id, 1),
            Err(ProgressError::MatchClosed)
        );
    }

    #[test]
    fn players_progress_independently() {
        let entity = pending_match();
        let mut guesses: Vec<_> = (1..=6)
            .map(|round| guess(entity.id, entity.player1_id, round))
            .collect();
        guesses.push(guess(entity.id, entity.player2_id, 1));
        let progress = MatchProgress::from_guesses(&entity, &guesses);

        assert_eq!(progress.next_round_for(entity.player1_id), Ok(None));
        assert_eq!(progress.next_round_for(entity.player2_id), Ok(Some(2)));
        assert!(!progress.both_finished());

        guesses.extend((2..=6).map(|round| guess(entity.id, entity.player2_id, round)));
        assert!(MatchProgress::from_guesses(&entity, &guesses).both_finished());
    }

    #[test]
    fn daily_limit_bounds_rounds() {
        let progress = RoundProgress::from_rounds([1, 2, 3, 4, 5], 5);
        assert!(progress.is_finished());
        assert_eq!(progress.next_round(), None);
        assert_eq!(
            progress.check(6),
            Err(ProgressError::RoundOutOfRange { round: 6, limit: 5 })
        );
    }

    #[test]
    fn recording_advances_to_the_next_round() {
        let mut progress = RoundProgress::from_rounds([1], 2);
        progress.record();
        assert_eq!(progress.next_round(), None);
        progress.record();
        assert_eq!(progress.played, 2);
    }

    #[test]
    fn out_of_range_rounds_are_not_counted() {
        let progress = RoundProgress::from_rounds([0, 1, 1, 9], 6);
        assert_eq!(progress.played, 1);
        assert_eq!(progress.next_round(), Some(2));
    }
}
