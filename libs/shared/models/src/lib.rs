pub mod clinic;
pub mod error;
pub mod schedule;
