//! Process-wide holder of the most recently published map artifact.
//!
//! Backed by a `watch` channel of `Option<Arc<CachedArtifact>>`: a publish
//! swaps in a fully built value, readers clone the `Arc`, and nobody ever
//! sees a partially written artifact.

use std::sync::Arc;
use tokio::sync::watch;

use crate::models::CachedArtifact;

#[derive(Clone)]
pub struct SnapshotCache {
    tx: Arc<watch::Sender<Option<Arc<CachedArtifact>>>>,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotCache {
    /// Creates an empty cache. [`SnapshotCache::read`] waits until the first
    /// [`SnapshotCache::replace`].
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Returns the current artifact, waiting for the first publish if there
    /// has not been one yet. Never waits on a publish in progress.
    pub async fn read(&self) -> Arc<CachedArtifact> {
        let mut rx = self.tx.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(artifact) = current {
                return artifact;
            }
            // `self` owns the sender, so the channel stays open while we wait.
            let _ = rx.changed().await;
        }
    }

    /// The current artifact, or `None` before the first publish.
    pub fn current(&self) -> Option<Arc<CachedArtifact>> {
        self.tx.borrow().clone()
    }

    /// Publishes `artifact`, visible to every subsequent read.
    pub fn replace(&self, artifact: CachedArtifact) {
        self.tx.send_replace(Some(Arc::new(artifact)));
    }
}
