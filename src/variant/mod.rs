//! Per-variant payload handlers.
//!
//! The engine is generic over the three minigames; anything that depends on
//! the variant (validation, completeness, correctness of a guess) dispatches
//! on the payload tag here.

pub mod drawing;
pub mod music;
pub mod statements;

use serde::{Deserialize, Serialize};

use crate::error::{SubmissionError, VotingError};
use crate::roster::Roster;
use crate::types::{Guess, ParticipantId, Payload, Variant};

/// Raw user input for a submission, before validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum SubmissionInput {
    Statements {
        texts: [String; 3],
        lie_index: usize,
    },
    Drawing {
        image: String,
        description: String,
    },
    Music {
        link: String,
    },
}

impl SubmissionInput {
    pub fn variant(&self) -> Variant {
        match self {
            SubmissionInput::Statements { .. } => Variant::Statements,
            SubmissionInput::Drawing { .. } => Variant::Drawing,
            SubmissionInput::Music { .. } => Variant::Music,
        }
    }

    /// Validate and turn into the stored payload
    pub fn into_payload(self) -> Result<Payload, SubmissionError> {
        match self {
            SubmissionInput::Statements { texts, lie_index } => {
                statements::build(texts, lie_index)
            }
            SubmissionInput::Drawing { image, description } => drawing::build(image, description),
            SubmissionInput::Music { link } => music::build(link),
        }
    }
}

/// Completeness test used by phase derivation; mirrors submission validation
pub fn is_complete(payload: &Payload) -> bool {
    match payload {
        Payload::Statements {
            statements: s,
            display_order,
        } => statements::is_complete(s, display_order),
        Payload::Drawing { image, description } => drawing::is_complete(image, description),
        Payload::Music { media_id, .. } => music::is_complete(media_id),
    }
}

/// Whether `guess` on `owner`'s payload scores a point
pub fn is_correct(payload: &Payload, owner: &ParticipantId, guess: &Guess) -> bool {
    match (payload, guess) {
        (Payload::Statements { statements: s, .. }, Guess::Statement(index)) => {
            statements::is_correct(s, *index)
        }
        (Payload::Drawing { description, .. }, Guess::Description(text)) => {
            drawing::is_correct(description, text)
        }
        (Payload::Music { .. }, Guess::Owner(guessed)) => music::is_correct(owner, guessed),
        _ => false,
    }
}

/// Shape check for a guess before it is recorded
pub fn validate_guess(variant: Variant, guess: &Guess, roster: &Roster) -> Result<(), VotingError> {
    if guess.variant() != variant {
        return Err(VotingError::InvalidGuess(format!(
            "{:?} guess in a {:?} session",
            guess.variant(),
            variant
        )));
    }

    match guess {
        Guess::Statement(index) if *index > 2 => Err(VotingError::InvalidGuess(format!(
            "statement index {} is out of range",
            index
        ))),
        Guess::Description(text) if text.trim().is_empty() => {
            Err(VotingError::InvalidGuess("guess is empty".to_string()))
        }
        Guess::Owner(owner) if !roster.contains(owner) => Err(VotingError::InvalidGuess(format!(
            "'{}' is not a participant",
            owner
        ))),
        _ => Ok(()),
    }
}
