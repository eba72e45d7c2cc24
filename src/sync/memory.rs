//! In-process channel over a shared [`DocumentStore`].
//!
//! Every client built on the same store sees the same documents, which is
//! how the integration tests run several participants in one process.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use super::{Snapshot, SyncChannel};
use crate::error::SyncResult;
use crate::patch::Patch;
use crate::store::DocumentStore;

#[derive(Clone, Default)]
pub struct MemoryChannel {
    store: DocumentStore,
}

impl MemoryChannel {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }
}

#[async_trait]
impl SyncChannel for MemoryChannel {
    async fn subscribe(&self, document: &str) -> SyncResult<BoxStream<'static, Snapshot>> {
        let (initial, rx) = self.store.subscribe(document).await;
        let document = document.to_string();

        let updates = stream::unfold(rx, move |mut rx| {
            let document = document.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(snapshot) => return Some((snapshot, rx)),
                        Err(RecvError::Lagged(skipped)) => {
                            // The next snapshot is complete, so skipping is safe
                            tracing::debug!(
                                "Subscriber of {} lagged, skipped {} snapshots",
                                document,
                                skipped
                            );
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(stream::once(async move { initial }).chain(updates).boxed())
    }

    async fn snapshot(&self, document: &str) -> SyncResult<Snapshot> {
        Ok(self.store.snapshot(document).await)
    }

    async fn write(&self, document: &str, patch: &Patch) -> SyncResult<u64> {
        Ok(self.store.apply(document, patch).await.version)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
