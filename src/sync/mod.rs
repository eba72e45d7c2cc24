//! The synchronization channel seam.
//!
//! The engine only needs eventually-consistent fan-out of scoped writes:
//! subscribers receive full-document snapshots, writers commit [`Patch`]es.
//! Any transport that can do that implements [`SyncChannel`].

pub mod memory;
pub mod retry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use memory::MemoryChannel;
pub use retry::commit_with_fallback;

use crate::error::SyncResult;
use crate::patch::Patch;

/// Full document state at one version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub document: String,
    /// Bumped once per committed patch
    pub version: u64,
    /// Hex SHA-256 of the canonical JSON of `data`
    pub digest: String,
    pub committed_at: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl Snapshot {
    pub fn new(document: &str, version: u64, data: serde_json::Value) -> Self {
        Self {
            document: document.to_string(),
            version,
            digest: digest(&data),
            committed_at: Utc::now(),
            data,
        }
    }
}

/// Content hash used to check that clients converged.
///
/// `serde_json` keeps object keys sorted, so equal documents serialize to
/// identical bytes.
pub fn digest(data: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Transport for a replicated document
#[async_trait]
pub trait SyncChannel: Send + Sync {
    /// Current snapshot followed by one snapshot per committed change.
    /// Intermediate snapshots may be skipped under load; each one is complete.
    async fn subscribe(&self, document: &str) -> SyncResult<BoxStream<'static, Snapshot>>;

    /// Current snapshot
    async fn snapshot(&self, document: &str) -> SyncResult<Snapshot>;

    /// Commit every op of `patch` as one merge, returning the new version
    async fn write(&self, document: &str, patch: &Patch) -> SyncResult<u64>;

    /// Name of this transport, for logging
    fn name(&self) -> &str;
}
