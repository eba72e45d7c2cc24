//! Creator-driven cursor over the roster for walking through results.

use super::{finalize, require_creator, require_phase};
use crate::error::AdminError;
use crate::patch::{DocPath, Patch};
use crate::roster::Roster;
use crate::types::{GameDocument, ParticipantId, Phase};

/// Point the cursor at `target`. The document flag mirrors the target's own
/// latch, so a participant that was already revealed shows results at once.
fn activate(doc: &GameDocument, target: &ParticipantId) -> Patch {
    let already_revealed = doc.slot(target).is_some_and(|s| s.revealed);
    let mut patch = Patch::new();
    patch.set(DocPath::field("active_participant"), target.clone());
    patch.set(DocPath::field("revealed"), already_revealed);
    patch.into_indivisible()
}

/// Roster position of the cursor; `None` when unset or pointing at someone
/// who left
fn cursor_position(doc: &GameDocument, roster: &Roster) -> Option<usize> {
    let active = doc.active_participant.as_deref()?;
    let position = roster.position(active);
    if position.is_none() {
        tracing::warn!("Cursor points at {} who is no longer in the roster", active);
    }
    position
}

fn check(
    doc: &GameDocument,
    roster: &Roster,
    caller: &str,
    creator: &str,
) -> Result<(), AdminError> {
    require_creator(caller, creator, "navigate")?;
    require_phase(roster, doc, creator, &[Phase::Results])?;
    if roster.is_empty() {
        return Err(AdminError::NoActiveParticipant);
    }
    Ok(())
}

/// Advance to the next participant. From the last participant, once they
/// are revealed, this moves on to the leaderboard instead of wrapping.
pub fn next(
    doc: &GameDocument,
    roster: &Roster,
    caller: &str,
    creator: &str,
) -> Result<Patch, AdminError> {
    check(doc, roster, caller, creator)?;

    let target = match cursor_position(doc, roster) {
        None => roster.first(),
        Some(i) if i + 1 == roster.len() => {
            if doc.revealed {
                return finalize::show_leaderboard(doc, roster, caller, creator);
            }
            roster.first()
        }
        Some(i) => roster.get(i + 1),
    }
    .ok_or(AdminError::NoActiveParticipant)?;

    Ok(activate(doc, target))
}

/// Step back to the previous participant, wrapping to the last
pub fn prev(
    doc: &GameDocument,
    roster: &Roster,
    caller: &str,
    creator: &str,
) -> Result<Patch, AdminError> {
    check(doc, roster, caller, creator)?;

    let target = match cursor_position(doc, roster) {
        None | Some(0) => roster.last(),
        Some(i) => roster.get(i - 1),
    }
    .ok_or(AdminError::NoActiveParticipant)?;

    Ok(activate(doc, target))
}

/// Jump straight to `target`
pub fn select(
    doc: &GameDocument,
    roster: &Roster,
    caller: &str,
    creator: &str,
    target: &ParticipantId,
) -> Result<Patch, AdminError> {
    check(doc, roster, caller, creator)?;
    if !roster.contains(target) {
        return Err(AdminError::UnknownParticipant(target.clone()));
    }
    Ok(activate(doc, target))
}
