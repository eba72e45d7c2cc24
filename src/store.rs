//! In-memory document store with snapshot fan-out.
//!
//! Backs both the in-process [`crate::sync::MemoryChannel`] and the relay
//! server. Each document is a JSON value plus a version counter and a
//! broadcast channel that receives a snapshot after every applied patch.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::patch::Patch;
use crate::sync::Snapshot;

struct StoredDocument {
    version: u64,
    data: Value,
    updates: broadcast::Sender<Snapshot>,
}

impl StoredDocument {
    fn new(capacity: usize) -> Self {
        let (updates, _rx) = broadcast::channel(capacity);
        Self {
            version: 0,
            data: Value::Null,
            updates,
        }
    }

    fn snapshot(&self, document: &str) -> Snapshot {
        Snapshot::new(document, self.version, self.data.clone())
    }
}

/// Shared store of documents keyed by path
#[derive(Clone)]
pub struct DocumentStore {
    documents: Arc<RwLock<HashMap<String, StoredDocument>>>,
    capacity: usize,
}

impl DocumentStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub async fn exists(&self, document: &str) -> bool {
        self.documents.read().await.contains_key(document)
    }

    /// Current snapshot; an unknown document is empty at version 0
    pub async fn snapshot(&self, document: &str) -> Snapshot {
        match self.documents.read().await.get(document) {
            Some(stored) => stored.snapshot(document),
            None => Snapshot::new(document, 0, Value::Null),
        }
    }

    /// Current snapshot plus a receiver for every later one
    pub async fn subscribe(&self, document: &str) -> (Snapshot, broadcast::Receiver<Snapshot>) {
        let mut documents = self.documents.write().await;
        let stored = documents
            .entry(document.to_string())
            .or_insert_with(|| StoredDocument::new(self.capacity));
        (stored.snapshot(document), stored.updates.subscribe())
    }

    /// Apply `patch` atomically and fan the new snapshot out
    pub async fn apply(&self, document: &str, patch: &Patch) -> Snapshot {
        let mut documents = self.documents.write().await;
        let stored = documents
            .entry(document.to_string())
            .or_insert_with(|| StoredDocument::new(self.capacity));

        patch.apply_to(&mut stored.data);
        stored.version += 1;

        let snapshot = stored.snapshot(document);
        tracing::debug!(
            "Applied {} ops to {} (version {})",
            patch.len(),
            document,
            snapshot.version
        );

        // Ignore send errors (no subscribers is fine)
        let _ = stored.updates.send(snapshot.clone());
        snapshot
    }

    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new(64)
    }
}
