pub mod calendar;
pub mod scheduler;

pub use scheduler::SlotScheduler;
