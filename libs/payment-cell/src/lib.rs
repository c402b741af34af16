// =====================================================================================
// PAYMENT CELL - GATEWAY WEBHOOK RECONCILER
// =====================================================================================
//
// Verifies gateway callbacks, folds each event into the order it names with a
// compare-and-set on the order revision, keeps the linked reorder in step, and
// invalidates the patient's cached read models before acknowledging.
//
// =====================================================================================

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::WebhookError;
pub use models::{EventKind, GatewayEvent, NoteMetadata, Reconciliation, WebhookAck};
pub use router::create_payment_router;
pub use services::{classify, encode_note, parse_note, reconcile, WebhookReconciler};
