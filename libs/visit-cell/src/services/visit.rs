use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use cache_cell::CacheConsistencyService;
use lock_cell::{LockManager, LockScope};
use scheduling_cell::SlotScheduler;
use shared_config::AppConfig;
use shared_database::{ClinicStore, LegacyOperation};
use shared_models::clinic::{IntakeRecord, Patient, Reservation, SlotKey};
use shared_utils::validation::{non_empty, validate_identifier};
use sync_cell::{CrossStoreSync, SyncOutcome};

use crate::error::VisitError;
use crate::models::{
    DoctorActionOutcome, DoctorActionRequest, IntakeOutcome, IntakeRequest, ReserveOutcome, ReserveRequest,
};
use crate::services::lifecycle::VisitLifecycleService;
use crate::services::snapshot::load_snapshot;

pub struct VisitService {
    store: Arc<dyn ClinicStore>,
    scheduler: Arc<SlotScheduler>,
    locks: LockManager,
    sync: Arc<CrossStoreSync>,
    cache: Arc<CacheConsistencyService>,
    lifecycle: VisitLifecycleService,
    config: Arc<AppConfig>,
}

impl VisitService {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        scheduler: Arc<SlotScheduler>,
        locks: LockManager,
        sync: Arc<CrossStoreSync>,
        cache: Arc<CacheConsistencyService>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            scheduler,
            locks,
            sync,
            cache,
            lifecycle: VisitLifecycleService::new(config.clinic_offset()),
            config,
        }
    }

    // ==============================================================================
    // INTAKE
    // ==============================================================================

    /// Stores the patient's questionnaire at most once.
    ///
    /// A repeat submission returns the existing intake with `dedup: true`.
    #[instrument(skip(self, request), fields(patient_id = %request.patient_id))]
    pub async fn submit_intake(&self, request: IntakeRequest) -> Result<IntakeOutcome, VisitError> {
        validate_identifier("patient_id", &request.patient_id).map_err(VisitError::Validation)?;
        let patient_id = request.patient_id.clone();

        let created = self
            .locks
            .with_patient_lock(&patient_id, self.config.intake_lock_timeout(), || async {
                if let Some(existing) = self.store.find_intake_by_patient(&patient_id).await? {
                    debug!("Intake {} already exists, deduplicating", existing.intake_id);
                    return Ok::<_, VisitError>(Err(existing));
                }

                let now = Utc::now();
                let patient = self.merge_patient(&request, now).await?;
                self.store.upsert_patient(&patient).await?;

                // Reservation-first flow: attach the booking made before the questionnaire.
                let reserve_id = self
                    .store
                    .reservations_for_patient(&patient_id)
                    .await?
                    .into_iter()
                    .find(Reservation::is_active)
                    .map(|r| r.reserve_id);

                let intake = IntakeRecord {
                    intake_id: Uuid::new_v4(),
                    patient_id: patient_id.clone(),
                    submitted_at: now,
                    answers: request.answers.clone(),
                    reserve_id,
                    status: Default::default(),
                    call_status: Default::default(),
                    call_status_updated_at: None,
                    doctor_note: None,
                    prescription_menu: None,
                    reviewed_at: None,
                    updated_at: now,
                };
                self.store.insert_intake(&intake).await?;
                info!("Stored intake {}", intake.intake_id);
                Ok(Ok((intake, patient)))
            })
            .await?;

        let (intake, patient) = match created {
            Ok(created) => created,
            Err(existing) => {
                return Ok(IntakeOutcome {
                    intake_id: existing.intake_id,
                    dedup: true,
                    reserve_id: existing.reserve_id,
                    sync: SyncOutcome::Synced,
                });
            }
        };

        let sync = self
            .sync
            .propagate_to_legacy(LegacyOperation::Intake {
                patient_id: patient.patient_id.clone(),
                display_name: patient.display_name.clone(),
                phone: patient.phone.clone(),
                contact_id: patient.contact_id.clone(),
                answers: intake.answers.clone(),
                submitted_at: intake.submitted_at,
            })
            .await;

        self.cache.invalidate(&patient_id).await?;

        Ok(IntakeOutcome {
            intake_id: intake.intake_id,
            dedup: false,
            reserve_id: intake.reserve_id,
            sync,
        })
    }

    async fn merge_patient(&self, request: &IntakeRequest, now: chrono::DateTime<Utc>) -> Result<Patient, VisitError> {
        let display_name = non_empty(request.display_name.clone());
        let phone = non_empty(request.phone.clone());
        let contact_id = non_empty(request.contact_id.clone());

        Ok(match self.store.get_patient(&request.patient_id).await? {
            Some(mut patient) => {
                if let Some(name) = display_name {
                    patient.display_name = name;
                }
                patient.phone = phone.or(patient.phone);
                patient.contact_id = contact_id.or(patient.contact_id);
                patient.updated_at = now;
                patient
            }
            None => Patient {
                patient_id: request.patient_id.clone(),
                display_name: display_name.unwrap_or_default(),
                contact_id,
                phone,
                created_at: now,
                updated_at: now,
            },
        })
    }

    // ==============================================================================
    // RESERVATION
    // ==============================================================================

    #[instrument(skip(self, request), fields(patient_id = %request.patient_id))]
    pub async fn reserve(&self, request: ReserveRequest) -> Result<ReserveOutcome, VisitError> {
        validate_identifier("patient_id", &request.patient_id).map_err(VisitError::Validation)?;
        validate_identifier("doctor_id", &request.doctor_id).map_err(VisitError::Validation)?;

        let slot = SlotKey::new(request.doctor_id.clone(), request.date, request.time);
        let booked = self.scheduler.reserve_slot(slot, &request.patient_id).await?;

        // Questionnaire-first flow: the intake exists and waits for a booking.
        let linked_intake_id = self
            .locks
            .with_patient_lock(&request.patient_id, self.config.intake_lock_timeout(), || async {
                let Some(intake) = self.store.find_intake_by_patient(&request.patient_id).await? else {
                    return Ok::<_, VisitError>(None);
                };
                if intake.reserve_id.as_deref() == Some(booked.reservation.reserve_id.as_str()) {
                    return Ok(Some(intake.intake_id));
                }
                let linked_is_active = match &intake.reserve_id {
                    Some(reserve_id) => self
                        .store
                        .get_reservation(reserve_id)
                        .await?
                        .is_some_and(|r| r.is_active()),
                    None => false,
                };
                if linked_is_active {
                    return Ok(None);
                }
                self.store
                    .link_intake_reservation(intake.intake_id, Some(&booked.reservation.reserve_id))
                    .await?;
                info!("Linked intake {} to {}", intake.intake_id, booked.reservation.reserve_id);
                Ok(Some(intake.intake_id))
            })
            .await?;

        self.cache.invalidate(&request.patient_id).await?;

        Ok(ReserveOutcome {
            reservation: booked.reservation,
            replaced: booked.replaced,
            linked_intake_id,
        })
    }

    /// Cancels a reservation unless the visit already reached payment.
    #[instrument(skip(self))]
    pub async fn cancel_reservation(&self, reserve_id: &str) -> Result<Reservation, VisitError> {
        let reservation = self
            .store
            .get_reservation(reserve_id)
            .await?
            .ok_or_else(|| VisitError::NotFound(format!("reservation {}", reserve_id)))?;

        let snapshot = load_snapshot(self.store.as_ref(), &reservation.patient_id).await?;
        if let Some(stage) = self.lifecycle.derive_stage(&snapshot, Utc::now()) {
            if stage.is_paid_or_later() {
                warn!("Refusing to cancel {} at stage {:?}", reserve_id, stage);
                return Err(VisitError::InvalidTransition(format!(
                    "reservation {} cannot be canceled once the visit is {:?}",
                    reserve_id, stage
                )));
            }
        }

        let canceled = self.scheduler.cancel_reservation(reserve_id).await?;
        self.cache.invalidate(&canceled.patient_id).await?;
        Ok(canceled)
    }

    // ==============================================================================
    // DOCTOR REVIEW
    // ==============================================================================

    /// Records a doctor action against an existing visit. Never creates one.
    #[instrument(skip(self, action), fields(reserve_id = ?action.reserve_id, patient_id = ?action.patient_id))]
    pub async fn record_doctor_action(&self, action: DoctorActionRequest) -> Result<DoctorActionOutcome, VisitError> {
        let reserve_id = non_empty(action.reserve_id.clone());
        let patient_id = non_empty(action.patient_id.clone());

        let (intake, reservation) = match (&reserve_id, &patient_id) {
            (None, None) => {
                return Err(VisitError::Validation("reserve_id or patient_id is required".to_string()));
            }
            (Some(reserve_id), _) => {
                let intake = self.store.find_intake_by_reserve_id(reserve_id).await?;
                let reservation = self.store.get_reservation(reserve_id).await?;
                (intake, reservation)
            }
            (None, Some(patient_id)) => {
                let intake = self.store.find_intake_by_patient(patient_id).await?;
                let reservation = match intake.as_ref().and_then(|i| i.reserve_id.as_deref()) {
                    Some(reserve_id) => self.store.get_reservation(reserve_id).await?,
                    None => None,
                };
                (intake, reservation)
            }
        };

        let (intake, reservation) = match (intake, reservation) {
            (Some(intake), Some(reservation))
                if reservation.is_active()
                    && reservation.patient_id == intake.patient_id
                    && patient_id.as_deref().map_or(true, |id| id == intake.patient_id) =>
            {
                (intake, reservation)
            }
            _ => {
                warn!("Doctor action without a reviewable visit");
                return Err(VisitError::NoMatchingVisit(format!(
                    "no reviewable visit for reserve_id={:?} patient_id={:?}",
                    reserve_id, patient_id
                )));
            }
        };

        let owner = intake.patient_id.clone();
        let reviewed = self
            .locks
            .with_lock(
                &LockScope::Intake(owner.clone()),
                self.config.intake_lock_timeout(),
                || async {
                    // Re-read under the lock so the update starts from the latest row.
                    let current = self
                        .store
                        .find_intake_by_reserve_id(&reservation.reserve_id)
                        .await?
                        .ok_or_else(|| VisitError::NoMatchingVisit(reservation.reserve_id.clone()))?;
                    let update = self.lifecycle.review_update(&current, &action, Utc::now())?;
                    Ok::<_, VisitError>(self.store.apply_review(current.intake_id, &update).await?)
                },
            )
            .await?;

        info!(
            patient_id = %owner,
            "Doctor recorded status={} call_status={} on {}", reviewed.status, reviewed.call_status, reservation.reserve_id
        );

        let sync = self
            .sync
            .propagate_to_legacy(LegacyOperation::DoctorUpdate {
                reserve_id: reservation.reserve_id.clone(),
                patient_id: owner.clone(),
                status: reviewed.status,
                call_status: reviewed.call_status,
                note: reviewed.doctor_note.clone(),
                menu: reviewed.prescription_menu.clone(),
            })
            .await;

        self.cache.invalidate(&owner).await?;

        Ok(DoctorActionOutcome { intake: reviewed, sync })
    }

    // ==============================================================================
    // CONTACT
    // ==============================================================================

    pub async fn update_contact_id(&self, patient_id: &str, contact_id: &str) -> Result<SyncOutcome, VisitError> {
        validate_identifier("patient_id", patient_id).map_err(VisitError::Validation)?;
        validate_identifier("contact_id", contact_id).map_err(VisitError::Validation)?;

        let outcome = self.sync.update_contact_id(patient_id, contact_id).await?;
        self.cache.invalidate(patient_id).await?;
        Ok(outcome)
    }
}
