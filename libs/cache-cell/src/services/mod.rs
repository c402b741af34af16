pub mod consistency;
pub mod edge;
pub mod local;

pub use consistency::CacheConsistencyService;
pub use edge::{EdgeCache, MemoryEdgeCache, RedisEdgeCache};
pub use local::LocalCache;
