use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

struct LocalEntry {
    generation: u64,
    value: String,
    expires_at: Instant,
}

/// Process-local tier. Entries are tagged with the edge generation they
/// were loaded under and are only returned for that same generation.
pub struct LocalCache {
    entries: RwLock<HashMap<String, LocalEntry>>,
    ttl: Duration,
}

impl LocalCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn get(&self, key: &str, current_generation: u64) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.generation == current_generation && entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    pub async fn put(&self, key: &str, generation: u64, value: String) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            LocalEntry {
                generation,
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub async fn remove(&self, keys: &[String]) {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
