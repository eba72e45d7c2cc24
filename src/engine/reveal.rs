//! Reveal and scoring.
//!
//! Scoring for a target runs at most once: the per-player `revealed` latch
//! is set in the same patch as the score updates, and every later reveal of
//! that target only raises the document-level flag. Scores are written as
//! absolute values computed from the snapshot, so replaying the same patch
//! (a retried write) cannot add a point twice. Scoring patches are
//! indivisible: scores and latches land together or not at all.

use serde::Serialize;

use super::{require_creator, require_phase};
use crate::error::AdminError;
use crate::patch::{DocPath, Patch};
use crate::roster::Roster;
use crate::types::{GameDocument, ParticipantId, Phase, PlayerSlot, Variant};
use crate::variant;

/// How one voter's guess on the revealed target turned out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuessOutcome {
    pub voter: ParticipantId,
    pub correct: bool,
}

/// Judge every roster member's guess on `target`. Members who did not vote
/// are left out.
pub fn judge_guesses(
    roster: &Roster,
    target: &ParticipantId,
    slot: &PlayerSlot,
) -> Vec<GuessOutcome> {
    roster
        .others(target)
        .filter_map(|voter| {
            let guess = slot.votes.get(voter)?;
            let correct = slot
                .payload
                .as_ref()
                .is_some_and(|payload| variant::is_correct(payload, target, guess));
            Some(GuessOutcome {
                voter: voter.clone(),
                correct,
            })
        })
        .collect()
}

/// Reveal the active participant and award points for correct guesses.
pub fn reveal(
    doc: &GameDocument,
    roster: &Roster,
    caller: &str,
    creator: &str,
) -> Result<Patch, AdminError> {
    require_creator(caller, creator, "reveal")?;
    require_phase(roster, doc, creator, &[Phase::Results])?;

    let target = doc
        .active_participant
        .as_ref()
        .ok_or(AdminError::NoActiveParticipant)?;
    let slot = doc.slot(target).ok_or(AdminError::NoActiveParticipant)?;

    let mut patch = Patch::new();
    if slot.revealed {
        tracing::info!("{} already revealed, not scoring again", target);
        patch.set(DocPath::field("revealed"), true);
        return Ok(patch);
    }

    let outcomes = judge_guesses(roster, target, slot);
    for outcome in &outcomes {
        if doc.variant == Variant::Drawing {
            patch.set(
                DocPath::player_field(target, "correct_guesses").child(&outcome.voter),
                outcome.correct,
            );
        }
        if outcome.correct {
            let current = doc.slot(&outcome.voter).map_or(0, |s| s.score);
            patch.set(
                DocPath::player_field(&outcome.voter, "score"),
                current.saturating_add(1),
            );
        }
    }

    patch.set(DocPath::player_field(target, "revealed"), true);
    patch.set(DocPath::field("revealed"), true);

    tracing::info!(
        "Revealed {}: {} of {} guesses correct",
        target,
        outcomes.iter().filter(|o| o.correct).count(),
        outcomes.len()
    );
    Ok(patch.into_indivisible())
}

/// Drawing only: the creator overrides the automatic verdict on one guess.
/// Flips the stored verdict and moves the voter's score by one, never
/// below zero.
pub fn toggle_correct_guess(
    doc: &GameDocument,
    caller: &str,
    creator: &str,
    target: &ParticipantId,
    voter: &ParticipantId,
) -> Result<Patch, AdminError> {
    require_creator(caller, creator, "change a verdict")?;
    if doc.variant != Variant::Drawing {
        return Err(AdminError::WrongVariant(Variant::Drawing));
    }
    if doc.is_finalized() || doc.retrospective_started {
        return Err(AdminError::GameFinished);
    }

    let slot = doc
        .slot(target)
        .ok_or_else(|| AdminError::UnknownParticipant(target.clone()))?;
    if !slot.revealed {
        return Err(AdminError::NotRevealed(target.clone()));
    }
    if voter == target || !slot.votes.contains_key(voter) {
        return Err(AdminError::NoGuess(voter.clone()));
    }
    let voter_score = doc
        .slot(voter)
        .map(|s| s.score)
        .ok_or_else(|| AdminError::UnknownParticipant(voter.clone()))?;

    let now_correct = !slot.correct_guesses.get(voter).copied().unwrap_or(false);
    let new_score = if now_correct {
        voter_score.saturating_add(1)
    } else {
        voter_score.saturating_sub(1)
    };

    tracing::info!(
        "Verdict on {}'s guess for {} set to {} (score {} -> {})",
        voter,
        target,
        now_correct,
        voter_score,
        new_score
    );

    let mut patch = Patch::new();
    patch.set(
        DocPath::player_field(target, "correct_guesses").child(voter),
        now_correct,
    );
    patch.set(DocPath::player_field(voter, "score"), new_score);
    Ok(patch.into_indivisible())
}
