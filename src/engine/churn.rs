//! Roster churn reconciliation.
//!
//! Runs whenever the resolved roster changes. Removed participants lose
//! their slot and every vote or verdict they cast. Music guesses that name
//! a removed participant as the owner are dropped too, so their voters
//! guess again among who is left. Participants without a slot get an empty
//! one. Phase never needs rolling back because it is
//! derived: fewer participants simply means fewer required votes.

use crate::patch::{DocPath, Patch};
use crate::roster::Roster;
use crate::types::{GameDocument, Guess, ParticipantId};

/// Slot owners no longer in the roster
pub fn departed(doc: &GameDocument, roster: &Roster) -> Vec<ParticipantId> {
    doc.players
        .keys()
        .filter(|id| !roster.contains(id))
        .cloned()
        .collect()
}

/// Roster members without a slot yet
pub fn arrived(doc: &GameDocument, roster: &Roster) -> Vec<ParticipantId> {
    roster
        .iter()
        .filter(|id| !doc.players.contains_key(id.as_str()))
        .cloned()
        .collect()
}

/// Writes that bring `doc` in line with `roster`. Empty when nothing is
/// stale. Several clients running this concurrently write the same values.
pub fn reconcile(doc: &GameDocument, roster: &Roster) -> Patch {
    let mut patch = Patch::new();

    let gone = departed(doc, roster);
    for id in &gone {
        patch.delete(DocPath::player(id));
    }

    for (owner, slot) in doc.players.iter().filter(|(id, _)| roster.contains(id)) {
        for (voter, guess) in &slot.votes {
            let stale = match guess {
                Guess::Owner(guessed) => !roster.contains(guessed),
                _ => false,
            };
            if stale || !roster.contains(voter) {
                patch.delete(DocPath::vote(owner, voter));
            }
        }
        for voter in slot.correct_guesses.keys().filter(|v| !roster.contains(v)) {
            patch.delete(DocPath::player_field(owner, "correct_guesses").child(voter));
        }
    }

    let new = arrived(doc, roster);
    for id in &new {
        patch.set(DocPath::player_field(id, "score"), 0);
        patch.set(DocPath::player_field(id, "revealed"), false);
    }

    if let Some(active) = doc.active_participant.as_deref() {
        if !roster.contains(active) {
            tracing::warn!("Active participant {} left, clearing cursor", active);
            patch.delete(DocPath::field("active_participant"));
            patch.set(DocPath::field("revealed"), false);
        }
    }

    if !patch.is_empty() {
        tracing::info!(
            "Reconciling roster: {} removed, {} added, {} writes",
            gone.len(),
            new.len(),
            patch.len()
        );
    }
    patch
}
