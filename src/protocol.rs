//! Relay wire protocol. Frames are JSON objects tagged by `t`.

use serde::{Deserialize, Serialize};

use crate::patch::{Patch, WriteOp};
use crate::sync::Snapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving snapshots of `document`
    Subscribe { document: String },
    /// Commit `ops` as one patch. `write_id` is echoed in the ack.
    Write {
        document: String,
        write_id: String,
        ops: Vec<WriteOp>,
    },
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Snapshot(Snapshot),
    Ack { write_id: String, version: u64 },
    Error { code: String, msg: String },
    Pong,
}

impl ServerMessage {
    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            msg: msg.into(),
        }
    }
}

/// Ops of a write frame as a patch
pub fn into_patch(ops: Vec<WriteOp>) -> Patch {
    ops.into_iter().collect()
}
