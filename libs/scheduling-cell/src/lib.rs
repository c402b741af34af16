// =====================================================================================
// SCHEDULING CELL - SLOT AVAILABILITY & ADMISSION CONTROL
// =====================================================================================
//
// Slots come from weekly rules, replaced wholesale by date overrides. A
// reservation is admitted under the patient's reservation lock and then the
// slot-key lock, always in that order.
//
// =====================================================================================

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::SchedulingError;
pub use models::{AvailableSlot, ReservationOutcome};
pub use router::create_scheduling_router;
pub use services::calendar::{effective_schedule, slot_times};
pub use services::SlotScheduler;
