use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared_models::clinic::{Order, PaymentStatus};

// ==============================================================================
// GATEWAY EVENTS
// ==============================================================================

/// Callback body as the gateway posts it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GatewayEvent {
    pub event_id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: EventData,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct EventData {
    pub order_id: Option<String>,
    /// Payment status reported by `payment.updated` style events.
    pub status: Option<String>,
    pub amount: Option<i64>,
    pub note: Option<String>,
    pub refund_id: Option<String>,
    pub refund_amount: Option<i64>,
    pub refund_status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PaymentCompleted,
    Refund,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundState {
    Pending,
    Completed,
    Failed,
}

impl RefundState {
    pub fn parse(status: Option<&str>) -> Self {
        match status.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("pending") | Some("processing") => RefundState::Pending,
            Some("failed") | Some("rejected") | Some("canceled") | Some("cancelled") => RefundState::Failed,
            _ => RefundState::Completed,
        }
    }
}

/// An event reduced to what the order reconciliation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    pub kind: EventKind,
    pub order_id: String,
    pub event_id: Option<String>,
    pub amount: Option<i64>,
    pub refund_id: Option<String>,
    pub refund_amount: Option<i64>,
    pub refund_state: RefundState,
    pub note: NoteMetadata,
}

impl OrderEvent {
    /// Idempotency key of a refund: the gateway refund id, else the event id.
    pub fn refund_key(&self) -> Option<&str> {
        self.refund_id.as_deref().or(self.event_id.as_deref())
    }
}

// ==============================================================================
// NOTE METADATA
// ==============================================================================

pub const NOTE_VERSION: u32 = 1;

/// Correlation data carried in the gateway's free-text note field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteMetadata {
    pub version: u32,
    pub patient_id: Option<String>,
    pub product_code: Option<String>,
    pub mode: Option<String>,
    pub reorder_id: Option<String>,
    /// Keys this version does not interpret, kept verbatim.
    pub extra: BTreeMap<String, String>,
}

impl Default for NoteMetadata {
    fn default() -> Self {
        Self {
            version: NOTE_VERSION,
            patient_id: None,
            product_code: None,
            mode: None,
            reorder_id: None,
            extra: BTreeMap::new(),
        }
    }
}

// ==============================================================================
// OUTCOMES
// ==============================================================================

/// What applying one event to the stored order requires.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// The order already reflects the event.
    Unchanged,
    Create(Order),
    Update(Order),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WebhookAck {
    Processed {
        order_id: String,
        payment_status: PaymentStatus,
        changed: bool,
    },
    Ignored {
        reason: String,
    },
}

impl WebhookAck {
    pub fn ignored(reason: impl Into<String>) -> Self {
        WebhookAck::Ignored { reason: reason.into() }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, WebhookAck::Ignored { .. })
    }
}
