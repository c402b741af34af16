pub mod note;
pub mod reconcile;
pub mod webhook;

pub use note::{encode_note, parse_note};
pub use reconcile::{classify, reconcile};
pub use webhook::WebhookReconciler;
