use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::CacheError;

/// Shared cache tier. Also the authority for per-key generations.
#[async_trait]
pub trait EdgeCache: Send + Sync {
    async fn generation(&self, key: &str) -> Result<u64, CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` only if the key is still at `generation`.
    async fn put_if_generation(
        &self,
        key: &str,
        value: &str,
        generation: u64,
        ttl: Duration,
    ) -> Result<bool, CacheError>;

    /// Bumps the generation of every key and drops its value, atomically.
    async fn invalidate(&self, keys: &[String]) -> Result<(), CacheError>;
}

// ==============================================================================
// REDIS
// ==============================================================================

const PUT_IF_GENERATION: &str = r#"
local current = redis.call("GET", KEYS[1])
if current == false then current = "0" end
if current == ARGV[1] then
    redis.call("SET", KEYS[2], ARGV[2], "EX", ARGV[3])
    return 1
end
return 0
"#;

/// Generations outlive values so a fenced writer cannot resurrect a key.
const GENERATION_TTL_SECS: u64 = 86_400;

pub struct RedisEdgeCache {
    pool: Pool,
}

impl RedisEdgeCache {
    pub fn new(redis_url: &str) -> Result<Self, CacheError> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Edge(format!("Failed to create Redis pool: {}", e)))?;
        info!("Redis edge cache initialized");
        Ok(Self { pool })
    }

    pub fn with_pool(pool: Pool) -> Self {
        Self { pool }
    }

    async fn get_connection(&self) -> Result<Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Edge(format!("Failed to get Redis connection: {}", e)))
    }

    fn generation_key(key: &str) -> String {
        format!("cache:gen:{}", key)
    }

    fn value_key(key: &str) -> String {
        format!("cache:val:{}", key)
    }
}

#[async_trait]
impl EdgeCache for RedisEdgeCache {
    async fn generation(&self, key: &str) -> Result<u64, CacheError> {
        let mut conn = self.get_connection().await?;
        let generation: Option<u64> = redis::cmd("GET")
            .arg(Self::generation_key(key))
            .query_async(&mut conn)
            .await?;
        Ok(generation.unwrap_or(0))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.get_connection().await?;
        let value: Option<String> = redis::cmd("GET")
            .arg(Self::value_key(key))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn put_if_generation(
        &self,
        key: &str,
        value: &str,
        generation: u64,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let mut conn = self.get_connection().await?;
        let stored: i32 = redis::Script::new(PUT_IF_GENERATION)
            .key(Self::generation_key(key))
            .key(Self::value_key(key))
            .arg(generation)
            .arg(value)
            .arg(ttl.as_secs().max(1))
            .invoke_async(&mut conn)
            .await?;
        Ok(stored == 1)
    }

    async fn invalidate(&self, keys: &[String]) -> Result<(), CacheError> {
        let mut conn = self.get_connection().await?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        for key in keys {
            let generation_key = Self::generation_key(key);
            pipe.cmd("INCR").arg(&generation_key).ignore();
            pipe.cmd("DEL").arg(Self::value_key(key)).ignore();
            pipe.cmd("EXPIRE").arg(&generation_key).arg(GENERATION_TTL_SECS).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        debug!("Invalidated edge keys {:?}", keys);
        Ok(())
    }
}

// ==============================================================================
// IN-MEMORY
// ==============================================================================

#[derive(Default)]
struct EdgeState {
    generations: HashMap<String, u64>,
    values: HashMap<String, (String, Instant)>,
}

/// Single-process stand-in for Redis, used without `REDIS_URL` and in tests.
#[derive(Default)]
pub struct MemoryEdgeCache {
    state: Mutex<EdgeState>,
    failing: AtomicBool,
}

impl MemoryEdgeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail, simulating an edge outage.
    pub fn set_failure(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Edge("edge cache unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EdgeCache for MemoryEdgeCache {
    async fn generation(&self, key: &str) -> Result<u64, CacheError> {
        self.check_available()?;
        Ok(self.state.lock().await.generations.get(key).copied().unwrap_or(0))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let expired = match state.values.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => return Ok(Some(value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            state.values.remove(key);
        }
        Ok(None)
    }

    async fn put_if_generation(
        &self,
        key: &str,
        value: &str,
        generation: u64,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let current = state.generations.get(key).copied().unwrap_or(0);
        if current != generation {
            return Ok(false);
        }
        state
            .values
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(true)
    }

    async fn invalidate(&self, keys: &[String]) -> Result<(), CacheError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        for key in keys {
            *state.generations.entry(key.clone()).or_insert(0) += 1;
            state.values.remove(key);
        }
        Ok(())
    }
}
