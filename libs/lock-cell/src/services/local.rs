use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::LockError;
use crate::models::HeldLock;
use crate::services::backend::LockBackend;

/// In-process backend: one tokio mutex per key, created on demand and
/// dropped from the registry once nobody holds or waits on it.
#[derive(Default)]
pub struct LocalLockBackend {
    registry: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LocalLockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn tracked_keys(&self) -> usize {
        self.registry.lock().await.len()
    }

    async fn entry(&self, key: &str) -> Arc<Mutex<()>> {
        let mut registry = self.registry.lock().await;
        registry
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn forget_if_idle(&self, key: &str) {
        let mut registry = self.registry.lock().await;
        if let Some(mutex) = registry.get(key) {
            // Only the registry itself still references it.
            if Arc::strong_count(mutex) == 1 {
                registry.remove(key);
            }
        }
    }
}

#[async_trait]
impl LockBackend for LocalLockBackend {
    async fn acquire(&self, key: &str, wait: Duration, _lease: Duration) -> Result<HeldLock, LockError> {
        let mutex = self.entry(key).await;

        match tokio::time::timeout(wait, mutex.clone().lock_owned()).await {
            Ok(guard) => {
                debug!("Acquired local lock {}", key);
                Ok(HeldLock::local(key.to_string(), Uuid::new_v4().to_string(), guard))
            }
            Err(_) => {
                drop(mutex);
                self.forget_if_idle(key).await;
                Err(LockError::Timeout {
                    key: key.to_string(),
                    waited: wait,
                })
            }
        }
    }

    async fn release(&self, mut lock: HeldLock) -> Result<(), LockError> {
        drop(lock.take_local_guard());
        self.forget_if_idle(&lock.key).await;
        debug!("Released local lock {}", lock.key);
        Ok(())
    }
}
