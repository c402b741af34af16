use std::time::Duration;

use async_trait::async_trait;

use crate::error::LockError;
use crate::models::HeldLock;

#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Waits up to `wait` for exclusive ownership of `key`. Remote backends
    /// hold the key for at most `lease` so a crashed holder cannot wedge it.
    async fn acquire(&self, key: &str, wait: Duration, lease: Duration) -> Result<HeldLock, LockError>;

    /// Releases a lock previously returned by `acquire`. Releasing a lock
    /// whose lease already expired is not an error.
    async fn release(&self, lock: HeldLock) -> Result<(), LockError>;
}
