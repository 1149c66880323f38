//! Standings, next playable round and aggregate recomputation.

use uuid::Uuid;

use crate::dao::models::{MatchEntity, ParticipantEntity};

use super::completion::MatchResult;

/// One standings line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingRow {
    pub user_id: Uuid,
    pub points: u32,
    pub matches_played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    /// Rounds won across every completed match of the player.
    pub rounds_won: u32,
}

/// Participants sorted by points, highest first.
///
/// The sort is stable and has no tiebreaker: equal points keep the participants' input order.
pub fn standings(participants: &[ParticipantEntity], matches: &[MatchEntity]) -> Vec<StandingRow> {
    let mut rows: Vec<StandingRow> = participants
        .iter()
        .map(|participant| StandingRow {
            user_id: participant.user_id,
            points: participant.points,
            matches_played: participant.matches_played,
            wins: participant.wins,
            draws: participant.draws,
            losses: participant.losses,
            rounds_won: rounds_won_by(participant.user_id, matches),
        })
        .collect();
    rows.sort_by(|a, b| b.points.cmp(&a.points));
    rows
}

fn rounds_won_by(user_id: Uuid, matches: &[MatchEntity]) -> u32 {
    matches
        .iter()
        .filter(|m| m.is_completed())
        .map(|m| {
            if m.player1_id == user_id {
                u32::from(m.player1_rounds_won)
            } else if m.player2_id == user_id {
                u32::from(m.player2_rounds_won)
            } else {
                0
            }
        })
        .sum()
}

/// Lowest fixture round that still has a pending match.
///
/// When everything is completed the final round is returned; an empty fixture yields `None`.
pub fn next_playable_round(matches: &[MatchEntity]) -> Option<u32> {
    matches
        .iter()
        .filter(|m| !m.is_completed())
        .map(|m| m.round_number)
        .min()
        .or_else(|| matches.iter().map(|m| m.round_number).max())
}

/// Rebuild participant aggregates from scratch out of the completed matches.
pub fn recompute_participants(
    participants: &[ParticipantEntity],
    matches: &[MatchEntity],
) -> Vec<ParticipantEntity> {
    let mut rebuilt: Vec<ParticipantEntity> = participants
        .iter()
        .map(|p| ParticipantEntity::new(p.championship_id, p.user_id))
        .collect();

    for entity in matches {
        let Some(result) = MatchResult::of(entity) else {
            continue;
        };
        let (first, second) = result.deltas();
        for participant in rebuilt
            .iter_mut()
            .filter(|p| p.championship_id == entity.championship_id)
        {
            if participant.user_id == entity.player1_id {
                first.apply(participant);
            } else if participant.user_id == entity.player2_id {
                second.apply(participant);
            }
        }
    }

    rebuilt
}

/// Pending matches of `user_id`, ordered by fixture round.
pub fn pending_matches_for(user_id: Uuid, matches: &[MatchEntity]) -> Vec<MatchEntity> {
    let mut pending: Vec<MatchEntity> = matches
        .iter()
        .filter(|m| !m.is_completed() && m.involves(user_id))
        .cloned()
        .collect();
    pending.sort_by_key(|m| m.round_number);
    pending
}
