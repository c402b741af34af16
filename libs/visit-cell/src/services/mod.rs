pub mod dashboard;
pub mod lifecycle;
pub mod reorder;
pub mod shipping;
pub mod snapshot;
pub mod visit;

pub use dashboard::DashboardService;
pub use lifecycle::VisitLifecycleService;
pub use reorder::ReorderService;
pub use shipping::ShippingService;
pub use visit::VisitService;
