//! Phase derivation.
//!
//! The phase is never stored. Every client recomputes it from the roster and
//! the latest snapshot, so two clients holding the same data always agree.

use crate::roster::Roster;
use crate::types::{GameDocument, ParticipantId, Phase, PlayerSlot, Variant};
use crate::variant;

/// Slot holds a valid payload for this session's variant
pub fn is_complete(slot: Option<&PlayerSlot>, variant: Variant) -> bool {
    slot.and_then(|s| s.payload.as_ref())
        .is_some_and(|p| p.variant() == variant && variant::is_complete(p))
}

pub fn all_submitted(roster: &Roster, doc: &GameDocument) -> bool {
    roster
        .iter()
        .all(|id| is_complete(doc.slot(id), doc.variant))
}

/// Votes every target needs: one from each other roster member
pub fn votes_required(roster: &Roster) -> usize {
    roster.len().saturating_sub(1)
}

/// Votes on `target` cast by current roster members. Stale voter keys
/// (removed participants not yet reconciled) do not count.
pub fn votes_received(roster: &Roster, doc: &GameDocument, target: &str) -> usize {
    let Some(slot) = doc.slot(target) else {
        return 0;
    };
    roster
        .others(target)
        .filter(|voter| slot.votes.contains_key(voter.as_str()))
        .count()
}

/// Every ordered pair (voter, target) of distinct roster members has a vote.
/// A roster of fewer than two is never fully voted.
pub fn all_voted(roster: &Roster, doc: &GameDocument) -> bool {
    roster.len() >= 2
        && roster
            .iter()
            .all(|target| votes_received(roster, doc, target) >= votes_required(roster))
}

/// Targets `voter` has not voted on yet, in roster order
pub fn pending_votes(roster: &Roster, doc: &GameDocument, voter: &str) -> Vec<ParticipantId> {
    roster
        .others(voter)
        .filter(|target| {
            doc.slot(target)
                .is_none_or(|slot| !slot.votes.contains_key(voter))
        })
        .cloned()
        .collect()
}

/// Map (roster, document) to the phase `caller` is in
pub fn derive_phase(roster: &Roster, doc: &GameDocument, caller: &str) -> Phase {
    if doc.retrospective_started {
        return Phase::Retrospective;
    }
    if doc.is_finalized() {
        return Phase::Leaderboard;
    }
    if !is_complete(doc.slot(caller), doc.variant) {
        return Phase::Submitting;
    }
    if !all_submitted(roster, doc) {
        return Phase::Waiting;
    }
    if !all_voted(roster, doc) {
        return Phase::Voting;
    }
    Phase::Results
}
