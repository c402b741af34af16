// =====================================================================================
// CACHE CELL - TWO-TIER READ CACHE
// =====================================================================================
//
// Dashboard and reorder read models are cached in two tiers:
// - edge (Redis, shared by every replica) which also owns a per-key
//   generation counter
// - local (process memory) whose entries remember the generation they were
//   loaded under and are only served while that generation is current
//
// Invalidation bumps the generation and drops the value in one atomic step,
// so a snapshot loaded before a write can never be stored or served after it.
//
// =====================================================================================

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::CacheError;
pub use models::CacheKey;
pub use router::create_cache_router;
pub use services::{CacheConsistencyService, EdgeCache, LocalCache, MemoryEdgeCache, RedisEdgeCache};
