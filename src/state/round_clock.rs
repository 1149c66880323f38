//! Session-local round timers. Clocks live only in process memory; a restart forgets them.

use std::time::Duration;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::{task::AbortHandle, time::Instant};
use uuid::Uuid;

use crate::{dao::models::PlayContext, geo::Coordinate, scoring::ScoringMode};

/// Countdown started when a round is shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundClock {
    started_at: Instant,
    budget: Duration,
}

impl RoundClock {
    pub fn start(budget: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn deadline(&self) -> Instant {
        self.started_at + self.budget
    }

    pub fn time_left(&self) -> Duration {
        self.budget.saturating_sub(self.started_at.elapsed())
    }

    /// Remaining time in fractional seconds, as fed to the scoring engine.
    pub fn time_left_secs(&self) -> f64 {
        self.time_left().as_secs_f64()
    }
}

/// Player and context a round belongs to. At most one round is open per owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoundOwner {
    pub context: PlayContext,
    pub user_id: Uuid,
}

/// Everything the submission path needs about an open round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundTicket {
    pub round: u8,
    pub target: Coordinate,
    pub mode: ScoringMode,
    pub clock: RoundClock,
}

struct OpenRound {
    ticket: RoundTicket,
    expiry: Option<AbortHandle>,
}

/// Registry of the rounds currently shown to players.
#[derive(Default)]
pub struct OpenRounds {
    rounds: DashMap<RoundOwner, OpenRound>,
}

impl OpenRounds {
    /// Open `ticket` for `owner`, or resume the clock if that same round is already open.
    ///
    /// Returns the ticket in effect and whether it was freshly opened.
    pub fn open(&self, owner: RoundOwner, ticket: RoundTicket) -> (RoundTicket, bool) {
        match self.rounds.entry(owner) {
            Entry::Occupied(entry) if entry.get().ticket.round == ticket.round => {
                (entry.get().ticket, false)
            }
            Entry::Occupied(mut entry) => {
                let previous = entry.insert(OpenRound {
                    ticket,
                    expiry: None,
                });
                if let Some(expiry) = previous.expiry {
                    expiry.abort();
                }
                (ticket, true)
            }
            Entry::Vacant(entry) => {
                entry.insert(OpenRound {
                    ticket,
                    expiry: None,
                });
                (ticket, true)
            }
        }
    }

    /// Attach the task that auto-submits `round` on expiry. The task is aborted right away when
    /// the round is no longer open.
    pub fn set_expiry(&self, owner: RoundOwner, round: u8, expiry: AbortHandle) {
        match self.rounds.get_mut(&owner) {
            Some(mut open) if open.ticket.round == round => {
                if let Some(previous) = open.expiry.replace(expiry) {
                    previous.abort();
                }
            }
            _ => expiry.abort(),
        }
    }

    /// Round currently open for `owner`.
    pub fn current(&self, owner: RoundOwner) -> Option<RoundTicket> {
        self.rounds.get(&owner).map(|open| open.ticket)
    }

    /// Close `round` for `owner`, handing back its ticket and expiry task.
    pub fn close(&self, owner: RoundOwner, round: u8) -> Option<(RoundTicket, Option<AbortHandle>)> {
        self.rounds
            .remove_if(&owner, |_, open| open.ticket.round == round)
            .map(|(_, open)| (open.ticket, open.expiry))
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::GameDay;

    fn owner() -> RoundOwner {
        RoundOwner {
            context: PlayContext::Daily(GameDay::today()),
            user_id: Uuid::new_v4(),
        }
    }

    fn ticket(round: u8, budget: Duration) -> RoundTicket {
        RoundTicket {
            round,
            target: Coordinate::new(1.0, 2.0),
            mode: ScoringMode::Absolute,
            clock: RoundClock::start(budget),
        }
    }

    #[tokio::test]
    async fn clock_counts_down_to_zero() {
        let clock = RoundClock::start(Duration::from_millis(30));
        assert!(clock.time_left() > Duration::ZERO);
        assert!(clock.time_left_secs() <= 0.03);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(clock.time_left(), Duration::ZERO);
    }

    #[tokio::test]
    async fn reopening_the_same_round_resumes_its_clock() {
        let rounds = OpenRounds::default();
        let owner = owner();
        let (first, fresh) = rounds.open(owner, ticket(1, Duration::from_secs(90)));
        assert!(fresh);

        let (resumed, fresh) = rounds.open(owner, ticket(1, Duration::from_secs(90)));
        assert!(!fresh);
        assert_eq!(resumed.clock, first.clock);
        assert_eq!(rounds.len(), 1);
    }

    #[tokio::test]
    async fn close_only_matches_the_open_round() {
        let rounds = OpenRounds::default();
        let owner = owner();
        rounds.open(owner, ticket(2, Duration::from_secs(30)));

        assert!(rounds.close(owner, 1).is_none());
        assert_eq!(rounds.current(owner).map(|t| t.round), Some(2));
        assert!(rounds.close(owner, 2).is_some());
        assert!(rounds.is_empty());
    }

    #[tokio::test]
    async fn replacing_a_round_aborts_its_expiry_task() {
        let rounds = OpenRounds::default();
        let owner = owner();
        rounds.open(owner, ticket(1, Duration::from_secs(30)));
        let task = tokio::spawn(async { tokio::time::sleep(Duration::from_secs(60)).await });
        rounds.set_expiry(owner, 1, task.abort_handle());

        rounds.open(owner, ticket(2, Duration::from_secs(30)));
        assert!(task.await.unwrap_err().is_cancelled());
    }
}
