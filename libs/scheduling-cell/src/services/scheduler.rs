use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use lock_cell::{LockManager, LockScope};
use shared_config::{AppConfig, ReservationPolicy};
use shared_database::ClinicStore;
use shared_models::clinic::{Reservation, ReservationStatus, SlotKey};
use shared_models::schedule::DateOverride;

use crate::error::SchedulingError;
use crate::models::{AvailableSlot, ReservationOutcome};
use crate::services::calendar::{effective_schedule, slot_times};

const MAX_RANGE_DAYS: i64 = 62;

pub struct SlotScheduler {
    store: Arc<dyn ClinicStore>,
    locks: LockManager,
    config: Arc<AppConfig>,
}

impl SlotScheduler {
    pub fn new(store: Arc<dyn ClinicStore>, locks: LockManager, config: Arc<AppConfig>) -> Self {
        Self { store, locks, config }
    }

    fn has_started(&self, date: NaiveDate, time: NaiveTime, now: DateTime<Utc>) -> bool {
        date.and_time(time)
            .and_local_timezone(self.config.clinic_offset())
            .single()
            .map(|start| start.with_timezone(&Utc) <= now)
            .unwrap_or(true)
    }

    /// Every slot the doctor offers in `[from, to]`, in date/time order,
    /// with remaining capacity. Slots that already started are omitted.
    #[instrument(skip(self))]
    pub async fn get_available_slots(
        &self,
        doctor_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AvailableSlot>, SchedulingError> {
        if to < from {
            return Err(SchedulingError::Validation("`to` must not be before `from`".to_string()));
        }
        if (to - from).num_days() > MAX_RANGE_DAYS {
            return Err(SchedulingError::Validation(format!(
                "date range must not exceed {} days",
                MAX_RANGE_DAYS
            )));
        }

        let rules = self.store.weekly_rules(doctor_id).await?;
        let overrides: HashMap<NaiveDate, DateOverride> = self
            .store
            .date_overrides(doctor_id, from, to)
            .await?
            .into_iter()
            .map(|o| (o.date, o))
            .collect();

        let mut booked: HashMap<SlotKey, u32> = HashMap::new();
        for reservation in self.store.active_reservations_between(doctor_id, from, to).await? {
            *booked.entry(reservation.slot_key()).or_insert(0) += 1;
        }

        let now = Utc::now();
        let mut slots = Vec::new();
        let mut date = from;
        while date <= to {
            if let Some(schedule) =
                effective_schedule(&rules, overrides.get(&date), date, self.config.default_slot_capacity)
            {
                for time in slot_times(&schedule) {
                    if self.has_started(date, time, now) {
                        continue;
                    }
                    let taken = booked
                        .get(&SlotKey::new(doctor_id, date, time))
                        .copied()
                        .unwrap_or(0);
                    slots.push(AvailableSlot {
                        date,
                        time,
                        capacity: schedule.capacity,
                        booked: taken,
                        remaining: schedule.capacity.saturating_sub(taken),
                    });
                }
            }
            date += Duration::days(1);
        }

        debug!("Found {} slots for {} between {} and {}", slots.len(), doctor_id, from, to);
        Ok(slots)
    }

    /// Capacity of the slot if the doctor offers it and it has not started.
    async fn offered_capacity(&self, slot: &SlotKey) -> Result<Option<u32>, SchedulingError> {
        if self.has_started(slot.date, slot.time, Utc::now()) {
            return Ok(None);
        }
        let rules = self.store.weekly_rules(&slot.doctor_id).await?;
        let overrides = self
            .store
            .date_overrides(&slot.doctor_id, slot.date, slot.date)
            .await?;

        Ok(
            effective_schedule(&rules, overrides.first(), slot.date, self.config.default_slot_capacity)
                .filter(|schedule| slot_times(schedule).contains(&slot.time))
                .map(|schedule| schedule.capacity),
        )
    }

    /// Books `slot` for `patient_id`.
    ///
    /// Holds the patient's reservation lock, then the slot lock, so neither
    /// the slot capacity nor the one-active-reservation rule can be raced.
    #[instrument(skip(self), fields(slot = %slot))]
    pub async fn reserve_slot(&self, slot: SlotKey, patient_id: &str) -> Result<ReservationOutcome, SchedulingError> {
        let capacity = self
            .offered_capacity(&slot)
            .await?
            .ok_or_else(|| SchedulingError::SlotNotOffered(slot.clone()))?;

        let wait = self.config.slot_lock_timeout();
        let patient_scope = LockScope::Reservation(patient_id.to_string());

        self.locks
            .with_lock(&patient_scope, wait, || async {
                let prior = self
                    .store
                    .reservations_for_patient(patient_id)
                    .await?
                    .into_iter()
                    .find(Reservation::is_active);

                if let Some(prior) = &prior {
                    match self.config.reservation_policy {
                        ReservationPolicy::Reject => {
                            return Err(SchedulingError::AlreadyBooked {
                                patient_id: patient_id.to_string(),
                                reserve_id: prior.reserve_id.clone(),
                            });
                        }
                        ReservationPolicy::Replace if prior.slot_key() == slot => {
                            debug!("Patient {} already holds {}, nothing to replace", patient_id, slot);
                            return Ok(ReservationOutcome {
                                reservation: prior.clone(),
                                replaced: None,
                            });
                        }
                        ReservationPolicy::Replace => {}
                    }
                }

                self.locks
                    .with_lock(&LockScope::Slot(slot.clone()), wait, || async {
                        self.admit(&slot, capacity, patient_id, prior).await
                    })
                    .await
            })
            .await
    }

    /// Check-then-insert for one slot. Caller holds the slot lock.
    async fn admit(
        &self,
        slot: &SlotKey,
        capacity: u32,
        patient_id: &str,
        prior: Option<Reservation>,
    ) -> Result<ReservationOutcome, SchedulingError> {
        let active = self.store.count_active_reservations(slot).await?;
        if active >= capacity {
            warn!("Slot {} is full ({}/{})", slot, active, capacity);
            return Err(SchedulingError::SlotFull(slot.clone()));
        }

        let now = Utc::now();
        let replaced = match prior {
            Some(prior) => {
                let canceled = self.store.cancel_reservation(&prior.reserve_id, now).await?;
                info!("Canceled reservation {} to replace it with {}", prior.reserve_id, slot);
                canceled
            }
            None => None,
        };

        let reservation = Reservation {
            reserve_id: Uuid::new_v4().to_string(),
            patient_id: patient_id.to_string(),
            doctor_id: slot.doctor_id.clone(),
            date: slot.date,
            time: slot.time,
            status: ReservationStatus::Pending,
            created_at: now,
            canceled_at: None,
        };
        self.store.insert_reservation(&reservation).await?;

        info!(
            patient_id = %patient_id,
            reserve_id = %reservation.reserve_id,
            "Reserved slot {} ({}/{})", slot, active + 1, capacity
        );
        Ok(ReservationOutcome { reservation, replaced })
    }

    /// Flips a reservation to canceled. Canceling twice is a no-op.
    #[instrument(skip(self))]
    pub async fn cancel_reservation(&self, reserve_id: &str) -> Result<Reservation, SchedulingError> {
        let existing = self
            .store
            .get_reservation(reserve_id)
            .await?
            .ok_or_else(|| SchedulingError::ReservationNotFound(reserve_id.to_string()))?;

        let scope = LockScope::Reservation(existing.patient_id.clone());
        self.locks
            .with_lock(&scope, self.config.slot_lock_timeout(), || async {
                let canceled = self
                    .store
                    .cancel_reservation(reserve_id, Utc::now())
                    .await?
                    .ok_or_else(|| SchedulingError::ReservationNotFound(reserve_id.to_string()))?;
                info!(patient_id = %canceled.patient_id, "Reservation {} is {}", reserve_id, canceled.status);
                Ok::<_, SchedulingError>(canceled)
            })
            .await
    }
}
