//! Leaderboard and retrospective latches. Both are one-way.

use super::phase::derive_phase;
use super::require_creator;
use crate::error::AdminError;
use crate::patch::{DocPath, Patch};
use crate::roster::Roster;
use crate::types::{GameDocument, ParticipantId, Phase};

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Standing {
    pub participant: ParticipantId,
    pub score: u32,
}

/// Roster members by score, highest first. Ties keep roster order.
pub fn standings(doc: &GameDocument, roster: &Roster) -> Vec<Standing> {
    let mut rows: Vec<Standing> = roster
        .iter()
        .map(|id| Standing {
            participant: id.clone(),
            score: doc.slot(id).map_or(0, |slot| slot.score),
        })
        .collect();
    rows.sort_by(|a, b| b.score.cmp(&a.score));
    rows
}

fn leaderboard_patch() -> Patch {
    let mut patch = Patch::new();
    patch.set(DocPath::field("final_leaderboard"), true);
    patch.set(DocPath::field("completed"), true);
    patch.set(DocPath::field("active_participant"), serde_json::Value::Null);
    patch.set(DocPath::field("revealed"), true);
    patch
}

/// End gameplay and show the leaderboard. Only legal once results are in.
pub fn show_leaderboard(
    doc: &GameDocument,
    roster: &Roster,
    caller: &str,
    creator: &str,
) -> Result<Patch, AdminError> {
    require_creator(caller, creator, "show the leaderboard")?;
    match derive_phase(roster, doc, creator) {
        Phase::Results | Phase::Leaderboard => {}
        Phase::Retrospective => return Err(AdminError::GameFinished),
        actual => {
            return Err(AdminError::WrongPhase {
                expected: Phase::Results,
                actual,
            })
        }
    }

    tracing::info!("Showing final leaderboard");
    Ok(leaderboard_patch())
}

/// Creator override: jump to the leaderboard from any phase. This is the
/// only way out of a voting phase that can never complete (a roster of one).
pub fn force_leaderboard(
    doc: &GameDocument,
    caller: &str,
    creator: &str,
) -> Result<Patch, AdminError> {
    require_creator(caller, creator, "force the leaderboard")?;
    if doc.retrospective_started {
        return Err(AdminError::GameFinished);
    }

    tracing::warn!("Creator forced the leaderboard, bypassing the derived phase");
    Ok(leaderboard_patch())
}

/// Signal every client to leave the minigame
pub fn start_retrospective(
    doc: &GameDocument,
    roster: &Roster,
    caller: &str,
    creator: &str,
) -> Result<Patch, AdminError> {
    require_creator(caller, creator, "start the retrospective")?;
    match derive_phase(roster, doc, creator) {
        Phase::Leaderboard | Phase::Retrospective => {
            tracing::info!("Starting retrospective");
            let mut patch = Patch::new();
            patch.set(DocPath::field("retrospective_started"), true);
            Ok(patch)
        }
        actual => Err(AdminError::WrongPhase {
            expected: Phase::Leaderboard,
            actual,
        }),
    }
}
