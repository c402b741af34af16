use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use cache_cell::{CacheConsistencyService, CacheKey};
use shared_database::ClinicStore;
use shared_models::clinic::CallStatus;

use crate::error::VisitError;
use crate::models::{DashboardView, ReordersView};
use crate::services::lifecycle::VisitLifecycleService;
use crate::services::snapshot::load_snapshot;

/// Cached read models. Misses load from the relational mirror only.
pub struct DashboardService {
    store: Arc<dyn ClinicStore>,
    cache: Arc<CacheConsistencyService>,
    lifecycle: VisitLifecycleService,
}

impl DashboardService {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        cache: Arc<CacheConsistencyService>,
        lifecycle: VisitLifecycleService,
    ) -> Self {
        Self { store, cache, lifecycle }
    }

    pub async fn get_dashboard(&self, patient_id: &str) -> Result<DashboardView, VisitError> {
        let store = self.store.clone();
        let key = CacheKey::Dashboard(patient_id.to_string());
        let snapshot = self
            .cache
            .get_or_populate(&key, || async move {
                let snapshot = load_snapshot(store.as_ref(), patient_id).await?;
                if snapshot.is_empty() {
                    return Err(VisitError::NotFound(format!("patient {}", patient_id)));
                }
                Ok::<_, VisitError>(snapshot)
            })
            .await?;

        let stage = self.lifecycle.derive_stage(&snapshot, Utc::now());
        let no_answer = snapshot
            .intake
            .as_ref()
            .is_some_and(|intake| intake.call_status == CallStatus::NoAnswer);
        debug!("Dashboard for {} at stage {:?}", patient_id, stage);

        Ok(DashboardView {
            stage,
            no_answer,
            snapshot,
        })
    }

    pub async fn get_reorders(&self, patient_id: &str) -> Result<ReordersView, VisitError> {
        let store = self.store.clone();
        let key = CacheKey::Reorders(patient_id.to_string());
        self.cache
            .get_or_populate(&key, || async move {
                Ok::<_, VisitError>(ReordersView {
                    patient_id: patient_id.to_string(),
                    reorders: store.reorders_for_patient(patient_id).await?,
                })
            })
            .await
    }
}
