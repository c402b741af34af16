use std::collections::VecDeque;

use tokio::sync::RwLock;

use crate::models::Inconsistency;

/// Operator queue of writes that reached only one store.
#[derive(Default)]
pub struct InconsistencyQueue {
    entries: RwLock<VecDeque<Inconsistency>>,
}

impl InconsistencyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a failed write, replacing any older entry for the same target.
    pub async fn push(&self, inconsistency: Inconsistency) {
        let target = inconsistency.write.target();
        let mut entries = self.entries.write().await;
        entries.retain(|entry| entry.write.target() != target);
        entries.push_back(inconsistency);
    }

    /// Drops queued writes a newer successful write has superseded.
    pub async fn remove_target(&self, target: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|entry| entry.write.target() != target);
        before - entries.len()
    }

    pub async fn list(&self) -> Vec<Inconsistency> {
        self.entries.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes everything currently queued, oldest first.
    pub async fn take_all(&self) -> Vec<Inconsistency> {
        self.entries.write().await.drain(..).collect()
    }

    /// Puts entries that are still failing back in front of newer ones.
    pub async fn requeue_front(&self, mut still_failing: Vec<Inconsistency>) {
        let mut entries = self.entries.write().await;
        while let Some(entry) = still_failing.pop() {
            entries.push_front(entry);
        }
    }
}
