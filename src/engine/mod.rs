//! Document transitions.
//!
//! Every operation here is a pure function of the latest snapshot (and the
//! roster): it either rejects the request or returns the [`Patch`] to commit.
//! Nothing in this module performs I/O; see [`crate::client`] for that.
//!
//! [`Patch`]: crate::patch::Patch

pub mod churn;
pub mod finalize;
pub mod navigation;
pub mod phase;
pub mod reveal;
pub mod submission;
pub mod vote;

pub use churn::reconcile;
pub use finalize::{force_leaderboard, show_leaderboard, standings, start_retrospective, Standing};
pub use navigation::{next, prev, select};
pub use phase::derive_phase;
pub use reveal::{reveal, toggle_correct_guess};
pub use submission::submit;
pub use vote::vote;

use crate::error::AdminError;
use crate::roster::Roster;
use crate::types::{GameDocument, Phase};

/// Administrative transitions are creator-only
fn require_creator(caller: &str, creator: &str, action: &'static str) -> Result<(), AdminError> {
    if caller != creator {
        return Err(AdminError::NotCreator(action));
    }
    Ok(())
}

/// The creator's derived phase must be one of `allowed`
fn require_phase(
    roster: &Roster,
    doc: &GameDocument,
    creator: &str,
    allowed: &[Phase],
) -> Result<Phase, AdminError> {
    let actual = phase::derive_phase(roster, doc, creator);
    if !allowed.contains(&actual) {
        return Err(match actual {
            Phase::Leaderboard | Phase::Retrospective => AdminError::GameFinished,
            _ => AdminError::WrongPhase {
                expected: allowed[0],
                actual,
            },
        });
    }
    Ok(actual)
}
