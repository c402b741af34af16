// =====================================================================================
// MONITORING CELL - OPERATOR ALERTS
// =====================================================================================
//
// Collects the failures that must reach a human: cache invalidations that did
// not complete (critical) and cross-store writes that left the two stores
// diverged (warning).
//
// =====================================================================================

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Alert, AlertSeverity};
pub use router::create_monitoring_router;
pub use services::AlertManagerService;
