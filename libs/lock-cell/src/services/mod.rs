pub mod backend;
pub mod local;
pub mod manager;
pub mod distributed;

pub use backend::LockBackend;
pub use local::LocalLockBackend;
pub use manager::LockManager;
pub use distributed::RedisLockBackend;
