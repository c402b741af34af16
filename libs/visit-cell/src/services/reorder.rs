use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use cache_cell::CacheConsistencyService;
use lock_cell::{LockManager, LockScope};
use shared_config::AppConfig;
use shared_database::ClinicStore;
use shared_models::clinic::{ReorderRequest, ReorderStatus, ReviewStatus};
use shared_utils::validation::{non_empty, validate_identifier};

use crate::error::VisitError;

pub struct ReorderService {
    store: Arc<dyn ClinicStore>,
    locks: LockManager,
    cache: Arc<CacheConsistencyService>,
    config: Arc<AppConfig>,
}

impl ReorderService {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        locks: LockManager,
        cache: Arc<CacheConsistencyService>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            locks,
            cache,
            config,
        }
    }

    /// Opens a reorder for an approved patient. One open reorder at a time.
    #[instrument(skip(self))]
    pub async fn create(&self, patient_id: &str, product_code: &str) -> Result<ReorderRequest, VisitError> {
        validate_identifier("patient_id", patient_id).map_err(VisitError::Validation)?;
        validate_identifier("product_code", product_code).map_err(VisitError::Validation)?;

        let reorder = self
            .locks
            .with_lock(
                &LockScope::Reorder(patient_id.to_string()),
                self.config.intake_lock_timeout(),
                || async {
                    let approved = self
                        .store
                        .find_intake_by_patient(patient_id)
                        .await?
                        .is_some_and(|intake| intake.status == ReviewStatus::Ok);
                    if !approved {
                        return Err(VisitError::InvalidTransition(format!(
                            "patient {} has no approved visit to reorder from",
                            patient_id
                        )));
                    }

                    let open = self
                        .store
                        .reorders_for_patient(patient_id)
                        .await?
                        .into_iter()
                        .find(|r| !r.status.is_terminal());
                    if let Some(open) = open {
                        return Err(VisitError::InvalidTransition(format!(
                            "reorder {} is still {}",
                            open.reorder_id, open.status
                        )));
                    }

                    let now = Utc::now();
                    let reorder = ReorderRequest {
                        reorder_id: Uuid::new_v4().to_string(),
                        patient_id: patient_id.to_string(),
                        product_code: product_code.to_string(),
                        status: ReorderStatus::Pending,
                        doctor_note: None,
                        created_at: now,
                        updated_at: now,
                    };
                    self.store.insert_reorder(&reorder).await?;
                    Ok::<_, VisitError>(reorder)
                },
            )
            .await?;

        info!(patient_id = %patient_id, "Reorder {} requested", reorder.reorder_id);
        self.cache.invalidate(patient_id).await?;
        Ok(reorder)
    }

    /// Doctor approval of a pending reorder.
    #[instrument(skip(self, doctor_note))]
    pub async fn confirm(&self, reorder_id: &str, doctor_note: Option<String>) -> Result<ReorderRequest, VisitError> {
        let note = non_empty(doctor_note);
        self.transition(reorder_id, ReorderStatus::Confirmed, note.as_deref())
            .await
    }

    /// Cancels a reorder that is not paid yet. Canceling twice is a no-op.
    #[instrument(skip(self))]
    pub async fn cancel(&self, reorder_id: &str) -> Result<ReorderRequest, VisitError> {
        self.transition(reorder_id, ReorderStatus::Canceled, None).await
    }

    async fn transition(
        &self,
        reorder_id: &str,
        target: ReorderStatus,
        doctor_note: Option<&str>,
    ) -> Result<ReorderRequest, VisitError> {
        let current = self
            .store
            .get_reorder(reorder_id)
            .await?
            .ok_or_else(|| VisitError::NotFound(format!("reorder {}", reorder_id)))?;

        if current.status == target {
            return Ok(current);
        }
        if !current.status.can_transition_to(&target) {
            warn!("Rejected reorder transition {} -> {} for {}", current.status, target, reorder_id);
            return Err(VisitError::InvalidTransition(format!(
                "reorder {} cannot move from {} to {}",
                reorder_id, current.status, target
            )));
        }

        let updated = self
            .store
            .transition_reorder(reorder_id, current.status, target, doctor_note, Utc::now())
            .await?
            .ok_or_else(|| {
                VisitError::InvalidTransition(format!(
                    "reorder {} changed concurrently; expected {}",
                    reorder_id, current.status
                ))
            })?;

        info!(patient_id = %updated.patient_id, "Reorder {} is now {}", reorder_id, updated.status);
        self.cache.invalidate(&updated.patient_id).await?;
        Ok(updated)
    }
}
