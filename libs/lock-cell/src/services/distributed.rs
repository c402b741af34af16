use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use rand::Rng;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::LockError;
use crate::models::HeldLock;
use crate::services::backend::LockBackend;

/// Deletes the key only if it still carries our token.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

const MIN_RETRY_MS: u64 = 25;
const MAX_RETRY_MS: u64 = 120;

pub struct RedisLockBackend {
    pool: Pool,
}

impl RedisLockBackend {
    pub fn new(redis_url: &str) -> Result<Self, LockError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| LockError::Backend(format!("Failed to create Redis pool: {}", e)))?;

        info!("Redis lock backend initialized");
        Ok(Self { pool })
    }

    pub fn with_pool(pool: Pool) -> Self {
        Self { pool }
    }

    async fn get_connection(&self) -> Result<Connection, LockError> {
        self.pool
            .get()
            .await
            .map_err(|e| LockError::Backend(format!("Failed to get Redis connection: {}", e)))
    }

    async fn try_set(&self, conn: &mut Connection, key: &str, token: &str, lease: Duration) -> Result<bool, LockError> {
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(lease.as_millis() as u64)
            .query_async(conn)
            .await?;
        Ok(reply.is_some())
    }
}

#[async_trait]
impl LockBackend for RedisLockBackend {
    async fn acquire(&self, key: &str, wait: Duration, lease: Duration) -> Result<HeldLock, LockError> {
        let token = Uuid::new_v4().to_string();
        let deadline = Instant::now() + wait;
        let mut conn = self.get_connection().await?;

        loop {
            if self.try_set(&mut conn, key, &token, lease).await? {
                debug!("Acquired Redis lock {} (lease {:?})", key, lease);
                return Ok(HeldLock::remote(key.to_string(), token));
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(LockError::Timeout {
                    key: key.to_string(),
                    waited: wait,
                });
            }

            let backoff = Duration::from_millis(rand::thread_rng().gen_range(MIN_RETRY_MS..=MAX_RETRY_MS));
            sleep(backoff.min(deadline - now)).await;
        }
    }

    async fn release(&self, lock: HeldLock) -> Result<(), LockError> {
        let mut conn = self.get_connection().await?;
        let deleted: i32 = redis::Script::new(RELEASE_SCRIPT)
            .key(&lock.key)
            .arg(&lock.token)
            .invoke_async(&mut conn)
            .await?;

        if deleted == 0 {
            warn!("Lock {} lease expired before release", lock.key);
        }
        Ok(())
    }
}
