use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::LockError;
use crate::models::LockScope;
use crate::services::backend::LockBackend;
use crate::services::local::LocalLockBackend;

/// Runs closures while holding a named lock.
#[derive(Clone)]
pub struct LockManager {
    backend: Arc<dyn LockBackend>,
    lease: Duration,
}

impl LockManager {
    pub fn new(backend: Arc<dyn LockBackend>, lease: Duration) -> Self {
        Self { backend, lease }
    }

    pub fn local(lease: Duration) -> Self {
        Self::new(Arc::new(LocalLockBackend::new()), lease)
    }

    /// Acquires `scope` within `wait`, runs `f`, then releases. The lock is
    /// released whether `f` succeeds or fails. A timeout never runs `f`.
    pub async fn with_lock<F, Fut, T, E>(&self, scope: &LockScope, wait: Duration, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LockError>,
    {
        scope.validate().map_err(LockError::InvalidScope)?;

        let key = scope.key();
        let lock = match self.backend.acquire(&key, wait, self.lease).await {
            Ok(lock) => lock,
            Err(err) => {
                warn!("Could not acquire {}: {}", key, err);
                return Err(err.into());
            }
        };

        let result = f().await;

        if let Err(err) = self.backend.release(lock).await {
            // The lease bounds how long a failed release can block others.
            warn!("Failed to release {}: {}", key, err);
        } else {
            debug!("Released {}", key);
        }

        result
    }

    pub async fn with_patient_lock<F, Fut, T, E>(&self, patient_id: &str, wait: Duration, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LockError>,
    {
        self.with_lock(&LockScope::Intake(patient_id.to_string()), wait, f)
            .await
    }
}
