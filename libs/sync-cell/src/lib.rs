// =====================================================================================
// SYNC CELL - LEGACY MASTER / RELATIONAL MIRROR PROPAGATION
// =====================================================================================
//
// Each patient field has one authoritative store. Writes go to the
// authoritative store first; a failed follower write is queued for operator
// repair instead of failing the patient-facing operation.
//
// =====================================================================================

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::SyncError;
pub use models::{Inconsistency, PatientField, PendingWrite, RepairReport, StoreKind, SyncOutcome};
pub use router::create_sync_router;
pub use services::{CrossStoreSync, InconsistencyQueue};
