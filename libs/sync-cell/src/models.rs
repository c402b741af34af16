use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use shared_database::LegacyOperation;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    LegacyMaster,
    RelationalMirror,
}

/// Fields whose authority is fixed. Reads never negotiate between stores.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PatientField {
    DisplayName,
    Phone,
    ContactId,
    IntakeAnswers,
    ReviewStatus,
    CallStatus,
    DoctorNote,
    PrescriptionMenu,
    Reservation,
    Reorder,
    Payment,
    Shipping,
}

impl PatientField {
    pub fn authority(&self) -> StoreKind {
        match self {
            PatientField::DisplayName | PatientField::Phone | PatientField::ContactId => StoreKind::LegacyMaster,
            _ => StoreKind::RelationalMirror,
        }
    }
}

/// A store write that failed and is waiting to be replayed.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum PendingWrite {
    Legacy { operation: LegacyOperation },
    MirrorContactId { patient_id: String, contact_id: String },
}

impl PendingWrite {
    pub fn patient_id(&self) -> &str {
        match self {
            PendingWrite::Legacy { operation } => operation.patient_id(),
            PendingWrite::MirrorContactId { patient_id, .. } => patient_id,
        }
    }

    /// The record a write targets. A newer write to the same target
    /// supersedes an older queued one.
    pub fn target(&self) -> String {
        match self {
            PendingWrite::Legacy {
                operation: LegacyOperation::DoctorUpdate { reserve_id, .. },
            } => format!("legacy:doctor_update:{}", reserve_id),
            PendingWrite::Legacy { operation } => {
                format!("legacy:{}:{}", operation.kind(), operation.patient_id())
            }
            PendingWrite::MirrorContactId { patient_id, .. } => format!("mirror:contact_id:{}", patient_id),
        }
    }

    pub fn failed_store(&self) -> StoreKind {
        match self {
            PendingWrite::Legacy { .. } => StoreKind::LegacyMaster,
            PendingWrite::MirrorContactId { .. } => StoreKind::RelationalMirror,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Inconsistency {
    pub id: Uuid,
    pub patient_id: String,
    pub failed_store: StoreKind,
    pub write: PendingWrite,
    pub last_error: String,
    pub attempts: u32,
    pub first_failed_at: DateTime<Utc>,
    pub last_attempt_at: DateTime<Utc>,
}

impl Inconsistency {
    pub fn new(write: PendingWrite, error: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            patient_id: write.patient_id().to_string(),
            failed_store: write.failed_store(),
            write,
            last_error: error,
            attempts: 1,
            first_failed_at: now,
            last_attempt_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Synced,
    Queued { inconsistency_id: Uuid },
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub struct RepairReport {
    pub attempted: usize,
    pub repaired: usize,
    pub still_pending: usize,
}
