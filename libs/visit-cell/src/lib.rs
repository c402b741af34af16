// =====================================================================================
// VISIT CELL - PATIENT JOURNEY STATE MACHINE
// =====================================================================================
//
// Intake → reservation → doctor review → reorder → payment → shipping.
//
// Every write commits to the relational mirror first, propagates to the legacy
// master store after its lock is released, and invalidates the patient's cached
// read models before returning.
//
// =====================================================================================

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::VisitError;
pub use models::{DashboardView, PatientSnapshot, ReordersView, VisitStage};
pub use router::{create_visit_router, VisitCellState};
pub use services::{
    DashboardService, ReorderService, ShippingService, VisitLifecycleService, VisitService,
};
