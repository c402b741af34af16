pub mod queue;
pub mod sync;

pub use queue::InconsistencyQueue;
pub use sync::CrossStoreSync;
