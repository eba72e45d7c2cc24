use crate::error::SubmissionError;
use crate::patch::{DocPath, Patch};
use crate::types::{GameDocument, ParticipantId};
use crate::variant::SubmissionInput;

/// Validate `input` and build the write for `participant`'s own slot.
///
/// Only `players/{participant}/payload` and `.../submitted_at` are written
/// (plus the initial score/latch when the slot does not exist yet), so
/// concurrent submissions and votes from other participants are never lost.
pub fn submit(
    doc: &GameDocument,
    participant: &ParticipantId,
    input: SubmissionInput,
) -> Result<Patch, SubmissionError> {
    if doc.is_finalized() || doc.retrospective_started {
        return Err(SubmissionError::GameFinished);
    }
    if input.variant() != doc.variant {
        return Err(SubmissionError::WrongVariant {
            expected: doc.variant,
            got: input.variant(),
        });
    }

    let existing = doc.slot(participant);
    if existing.is_some_and(|slot| slot.revealed) {
        return Err(SubmissionError::AlreadyRevealed);
    }

    let payload = input.into_payload()?;
    let payload =
        serde_json::to_value(&payload).map_err(|e| SubmissionError::Encoding(e.to_string()))?;

    let mut patch = Patch::new();
    if existing.is_none() {
        patch.set(DocPath::player_field(participant, "score"), 0);
        patch.set(DocPath::player_field(participant, "revealed"), false);
    }
    patch.set(DocPath::player_field(participant, "payload"), payload);
    patch.set(
        DocPath::player_field(participant, "submitted_at"),
        chrono::Utc::now().to_rfc3339(),
    );

    tracing::debug!(
        "Submission from {} touches {} paths",
        participant,
        patch.len()
    );
    Ok(patch)
}
