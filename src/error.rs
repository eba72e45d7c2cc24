//! Error taxonomy for the icebreaker engine.
//!
//! Validation errors are returned before anything is written. Transport
//! errors come out of the sync layer after the retry policy gave up.

use std::time::Duration;
use thiserror::Error;

use crate::types::{Phase, Variant};

/// Rejected submissions. Nothing is written when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("all three statements must be filled in")]
    IncompleteStatements,

    #[error("lie index {0} is out of range (expected 0..=2)")]
    InvalidLieIndex(usize),

    #[error("a drawing is required")]
    MissingImage,

    #[error("a description of the drawing is required")]
    MissingDescription,

    #[error("image data could not be decoded")]
    InvalidImageData,

    #[error("no media id could be found in link '{0}'")]
    InvalidLink(String),

    #[error("this session plays {expected:?}, not {got:?}")]
    WrongVariant { expected: Variant, got: Variant },

    #[error("submission was already revealed and can no longer change")]
    AlreadyRevealed,

    #[error("the game has already finished")]
    GameFinished,

    #[error("submission could not be encoded: {0}")]
    Encoding(String),
}

/// Rejected votes. Nothing is written when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VotingError {
    #[error("participants cannot vote on their own submission")]
    SelfVote,

    #[error("participant '{0}' has no slot to vote on")]
    UnknownTarget(String),

    #[error("votes are only accepted during the voting phase")]
    NotVotingPhase,

    #[error("submission of '{0}' was already revealed")]
    AlreadyRevealed(String),

    #[error("invalid guess: {0}")]
    InvalidGuess(String),

    #[error("vote could not be encoded: {0}")]
    Encoding(String),
}

/// Rejected creator-only transitions (reveal, navigation, finalization).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    #[error("only the creator can {0}")]
    NotCreator(&'static str),

    #[error("there is no active participant")]
    NoActiveParticipant,

    #[error("participant '{0}' is not in the roster")]
    UnknownParticipant(String),

    #[error("submission of '{0}' has not been revealed yet")]
    NotRevealed(String),

    #[error("'{0}' made no guess on this submission")]
    NoGuess(String),

    #[error("operation is only available for {0:?} sessions")]
    WrongVariant(Variant),

    #[error("operation requires the {expected:?} phase, currently {actual:?}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("the game has already finished")]
    GameFinished,
}

/// Failures of the synchronization channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("write failed after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("document could not be decoded: {0}")]
    Decode(String),

    #[error("subscription closed")]
    Closed,
}

impl SyncError {
    /// Whether the retry policy should try this write again
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transport(_) | SyncError::Timeout(_))
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Any failure surfaced by [`crate::client::IcebreakerClient`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Voting(#[from] VotingError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl EngineError {
    /// Machine-readable code, used in relay error frames and by UIs
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Submission(SubmissionError::InvalidLink(_)) => "INVALID_LINK",
            EngineError::Submission(_) => "VALIDATION_ERROR",
            EngineError::Voting(VotingError::SelfVote) => "SELF_VOTE",
            EngineError::Voting(VotingError::UnknownTarget(_)) => "UNKNOWN_TARGET",
            EngineError::Voting(VotingError::NotVotingPhase) => "NOT_VOTING_PHASE",
            EngineError::Voting(_) => "INVALID_VOTE",
            EngineError::Admin(AdminError::NotCreator(_)) => "NOT_CREATOR",
            EngineError::Admin(AdminError::NoActiveParticipant) => "NO_ACTIVE_PARTICIPANT",
            EngineError::Admin(_) => "INVALID_STATE",
            EngineError::Sync(_) => "WRITE_FAILED",
        }
    }

    /// Transport failures can be retried by the user; everything else needs
    /// different input
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Sync(SyncError::Exhausted { .. })
                | EngineError::Sync(SyncError::Transport(_))
                | EngineError::Sync(SyncError::Timeout(_))
        )
    }
}
