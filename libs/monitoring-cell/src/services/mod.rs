pub mod alerts;

pub use alerts::AlertManagerService;
