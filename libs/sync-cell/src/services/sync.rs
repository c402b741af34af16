use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use monitoring_cell::{AlertManagerService, AlertSeverity};
use shared_database::{ClinicStore, LegacyOperation, LegacyStore};

use crate::error::SyncError;
use crate::models::{Inconsistency, PatientField, PendingWrite, RepairReport, StoreKind, SyncOutcome};
use crate::services::queue::InconsistencyQueue;

pub struct CrossStoreSync {
    mirror: Arc<dyn ClinicStore>,
    legacy: Arc<dyn LegacyStore>,
    queue: InconsistencyQueue,
    alerts: Arc<AlertManagerService>,
}

impl CrossStoreSync {
    pub fn new(mirror: Arc<dyn ClinicStore>, legacy: Arc<dyn LegacyStore>, alerts: Arc<AlertManagerService>) -> Self {
        Self {
            mirror,
            legacy,
            queue: InconsistencyQueue::new(),
            alerts,
        }
    }

    /// Sends a write the mirror already committed on to the legacy master.
    /// A failure is queued, never returned.
    #[instrument(skip(self, operation), fields(op = operation.kind(), patient_id = operation.patient_id()))]
    pub async fn propagate_to_legacy(&self, operation: LegacyOperation) -> SyncOutcome {
        match self.legacy.call(&operation).await {
            Ok(_) => {
                debug!("Legacy master store accepted {}", operation.kind());
                self.supersede(&PendingWrite::Legacy { operation }).await;
                SyncOutcome::Synced
            }
            Err(err) => {
                self.record_inconsistency(PendingWrite::Legacy { operation }, err.to_string())
                    .await
            }
        }
    }

    /// Updates the messaging contact id in both stores.
    #[instrument(skip(self))]
    pub async fn update_contact_id(&self, patient_id: &str, contact_id: &str) -> Result<SyncOutcome, SyncError> {
        if self.mirror.get_patient(patient_id).await?.is_none() {
            return Err(SyncError::PatientNotFound(patient_id.to_string()));
        }

        self.write_with_authority(
            PatientField::ContactId,
            LegacyOperation::SaveContactId {
                patient_id: patient_id.to_string(),
                contact_id: contact_id.to_string(),
            },
            PendingWrite::MirrorContactId {
                patient_id: patient_id.to_string(),
                contact_id: contact_id.to_string(),
            },
        )
        .await
    }

    /// Writes the authoritative store first and fails if that write fails.
    /// The follower write is queued on failure.
    async fn write_with_authority(
        &self,
        field: PatientField,
        legacy_operation: LegacyOperation,
        mirror_write: PendingWrite,
    ) -> Result<SyncOutcome, SyncError> {
        match field.authority() {
            StoreKind::LegacyMaster => {
                self.legacy.call(&legacy_operation).await?;
                match self.apply(&mirror_write).await {
                    Ok(()) => {
                        self.supersede(&mirror_write).await;
                        info!("{:?} updated in both stores", field);
                        Ok(SyncOutcome::Synced)
                    }
                    Err(err) => Ok(self.record_inconsistency(mirror_write, err.to_string()).await),
                }
            }
            StoreKind::RelationalMirror => {
                self.apply(&mirror_write).await?;
                Ok(self.propagate_to_legacy(legacy_operation).await)
            }
        }
    }

    pub async fn pending(&self) -> Vec<Inconsistency> {
        self.queue.list().await
    }

    /// Replays every queued write once. Writes that fail again stay queued.
    pub async fn process_repair_queue(&self) -> RepairReport {
        let entries = self.queue.take_all().await;
        let mut report = RepairReport {
            attempted: entries.len(),
            ..RepairReport::default()
        };
        let mut still_failing = Vec::new();

        for mut entry in entries {
            match self.apply(&entry.write).await {
                Ok(()) => {
                    info!(
                        patient_id = %entry.patient_id,
                        "Repaired inconsistency {} after {} attempts", entry.id, entry.attempts
                    );
                    report.repaired += 1;
                }
                Err(err) => {
                    entry.attempts += 1;
                    entry.last_error = err.to_string();
                    entry.last_attempt_at = Utc::now();
                    still_failing.push(entry);
                }
            }
        }

        report.still_pending = still_failing.len();
        if !still_failing.is_empty() {
            warn!("{} inconsistencies still pending after repair", still_failing.len());
        }
        self.queue.requeue_front(still_failing).await;
        report
    }

    async fn supersede(&self, write: &PendingWrite) {
        let dropped = self.queue.remove_target(&write.target()).await;
        if dropped > 0 {
            info!(
                patient_id = write.patient_id(),
                "Newer write superseded {} queued inconsistency", dropped
            );
        }
    }

    async fn apply(&self, write: &PendingWrite) -> Result<(), SyncError> {
        match write {
            PendingWrite::Legacy { operation } => {
                let current = self.current_legacy_operation(operation).await?;
                self.legacy.call(&current).await?;
            }
            PendingWrite::MirrorContactId { patient_id, contact_id } => {
                let mut patient = self
                    .mirror
                    .get_patient(patient_id)
                    .await?
                    .ok_or_else(|| SyncError::PatientNotFound(patient_id.clone()))?;
                patient.contact_id = Some(contact_id.clone());
                patient.updated_at = Utc::now();
                self.mirror.upsert_patient(&patient).await?;
            }
        }
        Ok(())
    }

    /// Rebuilds a queued legacy write from what the mirror holds now, so a
    /// replay never sends an older state than a later write delivered.
    /// Contact ids are owned by the legacy master and replay as queued.
    async fn current_legacy_operation(&self, queued: &LegacyOperation) -> Result<LegacyOperation, SyncError> {
        let rebuilt = match queued {
            LegacyOperation::Intake { patient_id, .. } => {
                let patient = self.mirror.get_patient(patient_id).await?;
                let intake = self.mirror.find_intake_by_patient(patient_id).await?;
                match (patient, intake) {
                    (Some(patient), Some(intake)) => Some(LegacyOperation::Intake {
                        patient_id: patient.patient_id,
                        display_name: patient.display_name,
                        phone: patient.phone,
                        contact_id: patient.contact_id,
                        answers: intake.answers,
                        submitted_at: intake.submitted_at,
                    }),
                    _ => None,
                }
            }
            LegacyOperation::DoctorUpdate { reserve_id, patient_id, .. } => self
                .mirror
                .find_intake_by_reserve_id(reserve_id)
                .await?
                .filter(|intake| &intake.patient_id == patient_id)
                .map(|intake| LegacyOperation::DoctorUpdate {
                    reserve_id: reserve_id.clone(),
                    patient_id: patient_id.clone(),
                    status: intake.status,
                    call_status: intake.call_status,
                    note: intake.doctor_note,
                    menu: intake.prescription_menu,
                }),
            LegacyOperation::SaveContactId { .. } => None,
        };
        Ok(rebuilt.unwrap_or_else(|| queued.clone()))
    }

    async fn record_inconsistency(&self, write: PendingWrite, error: String) -> SyncOutcome {
        let inconsistency = Inconsistency::new(write, error);
        let id = inconsistency.id;

        warn!(
            patient_id = %inconsistency.patient_id,
            store = ?inconsistency.failed_store,
            "Store write failed, queued for repair: {}", inconsistency.last_error
        );
        self.alerts
            .raise(
                AlertSeverity::Warning,
                "sync",
                "Stores diverged",
                format!(
                    "{:?} write failed and was queued as {}: {}",
                    inconsistency.failed_store, id, inconsistency.last_error
                ),
                Some(&inconsistency.patient_id),
                &[
                    ("inconsistency_id", id.to_string()),
                    ("failed_store", format!("{:?}", inconsistency.failed_store)),
                    ("target", inconsistency.write.target()),
                ],
            )
            .await;

        self.queue.push(inconsistency).await;
        SyncOutcome::Queued { inconsistency_id: id }
    }
}
