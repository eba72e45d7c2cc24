use super::phase::derive_phase;
use crate::error::VotingError;
use crate::patch::{DocPath, Patch, WriteOp};
use crate::roster::Roster;
use crate::types::{GameDocument, Guess, ParticipantId, Phase};
use crate::variant;

/// Record `voter`'s guess on `target`'s slot.
///
/// The write is scoped to `players/{target}/votes/{voter}`, a path only
/// `voter` ever writes, so votes from different voters on the same target
/// cannot clobber each other. Voting again before the reveal overwrites
/// the same key.
pub fn vote(
    doc: &GameDocument,
    roster: &Roster,
    voter: &ParticipantId,
    target: &ParticipantId,
    guess: Guess,
) -> Result<Patch, VotingError> {
    if voter == target {
        return Err(VotingError::SelfVote);
    }

    let slot = doc
        .slot(target)
        .filter(|_| roster.contains(target))
        .ok_or_else(|| VotingError::UnknownTarget(target.clone()))?;

    if derive_phase(roster, doc, voter) != Phase::Voting {
        return Err(VotingError::NotVotingPhase);
    }
    if slot.revealed {
        return Err(VotingError::AlreadyRevealed(target.clone()));
    }
    variant::validate_guess(doc.variant, &guess, roster)?;

    let value = serde_json::to_value(&guess).map_err(|e| VotingError::Encoding(e.to_string()))?;
    tracing::debug!("Vote from {} on {}: {:?}", voter, target, guess);

    Ok(Patch::single(WriteOp::set(DocPath::vote(target, voter), value)))
}
