// =====================================================================================
// LOCK CELL - NAMED MUTUAL EXCLUSION
// =====================================================================================
//
// Serializes check-then-act sequences per patient and per slot key without
// blocking unrelated keys. Every acquisition is bounded by a wait timeout.
//
// Backends:
// - LocalLockBackend: per-key tokio mutexes, single process
// - RedisLockBackend: SET NX PX lease with token-checked release, shared by
//   every API replica pointed at the same Redis
//
// =====================================================================================

pub mod error;
pub mod models;
pub mod services;

pub use error::LockError;
pub use models::{HeldLock, LockScope};
pub use services::{LocalLockBackend, LockBackend, LockManager, RedisLockBackend};
