use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque ID types
pub type ParticipantId = String;
pub type SessionId = String;

/// Which minigame a session plays. Fixed when the document is created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Statements,
    Drawing,
    Music,
}

/// Derived game phase. Never stored in the document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Submitting,
    Waiting,
    Voting,
    Results,
    Leaderboard,
    Retrospective,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    pub is_lie: bool,
}

/// Variant-specific content of a slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Payload {
    Statements {
        statements: [Statement; 3],
        /// Permutation of statement indices, drawn once at submission
        display_order: [usize; 3],
    },
    Drawing {
        /// Opaque image data (data URL or URI)
        image: String,
        description: String,
    },
    Music {
        link: String,
        media_id: String,
    },
}

impl Payload {
    pub fn variant(&self) -> Variant {
        match self {
            Payload::Statements { .. } => Variant::Statements,
            Payload::Drawing { .. } => Variant::Drawing,
            Payload::Music { .. } => Variant::Music,
        }
    }
}

/// A vote cast on somebody else's slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Guess {
    /// Index (0-2) of the statement the voter thinks is the lie
    Statement(usize),
    /// What the voter thinks the drawing shows
    Description(String),
    /// Who the voter thinks posted the song
    Owner(ParticipantId),
}

impl Guess {
    pub fn variant(&self) -> Variant {
        match self {
            Guess::Statement(_) => Variant::Statements,
            Guess::Description(_) => Variant::Drawing,
            Guess::Owner(_) => Variant::Music,
        }
    }
}

/// One participant's submission, the votes it received and their score.
///
/// Field ownership: `payload` and `submitted_at` belong to the owner,
/// `votes[voter]` belongs to that voter, everything else to the creator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(default)]
    pub votes: BTreeMap<ParticipantId, Guess>,
    /// Drawing only: per-voter correctness, filled at reveal
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub correct_guesses: BTreeMap<ParticipantId, bool>,
    #[serde(default)]
    pub score: u32,
    /// Scoring already ran for this slot
    #[serde(default)]
    pub revealed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// The replicated aggregate every client reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameDocument {
    pub variant: Variant,
    #[serde(default)]
    pub players: BTreeMap<ParticipantId, PlayerSlot>,
    #[serde(default)]
    pub active_participant: Option<ParticipantId>,
    #[serde(default)]
    pub revealed: bool,
    #[serde(default)]
    pub final_leaderboard: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub retrospective_started: bool,
}

impl GameDocument {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            players: BTreeMap::new(),
            active_participant: None,
            revealed: false,
            final_leaderboard: false,
            completed: false,
            retrospective_started: false,
        }
    }

    /// Decode a raw snapshot. An empty document (no data or no `variant`
    /// yet) decodes as a fresh game of `variant`.
    pub fn from_value(
        value: &serde_json::Value,
        variant: Variant,
    ) -> Result<Self, serde_json::Error> {
        match value {
            serde_json::Value::Null => Ok(Self::new(variant)),
            serde_json::Value::Object(map) if !map.contains_key("variant") => {
                let mut map = map.clone();
                map.insert("variant".to_string(), serde_json::to_value(variant)?);
                serde_json::from_value(serde_json::Value::Object(map))
            }
            other => serde_json::from_value(other.clone()),
        }
    }

    pub fn slot(&self, id: &str) -> Option<&PlayerSlot> {
        self.players.get(id)
    }

    /// Leaderboard latches are set; gameplay mutations are over
    pub fn is_finalized(&self) -> bool {
        self.final_leaderboard || self.completed
    }
}

/// Entry of the externally supplied roster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: ParticipantId,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Kicked participants stay in the external list with this marker
    #[serde(default)]
    pub removed: bool,
}

impl RosterEntry {
    pub fn new(id: impl Into<ParticipantId>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            removed: false,
        }
    }
}
