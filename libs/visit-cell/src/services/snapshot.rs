use chrono::Utc;

use shared_database::{ClinicStore, StoreError};

use crate::models::PatientSnapshot;

/// Reads a patient's journey straight from the relational mirror.
pub async fn load_snapshot(store: &dyn ClinicStore, patient_id: &str) -> Result<PatientSnapshot, StoreError> {
    let patient = store.get_patient(patient_id).await?;
    let intake = store.find_intake_by_patient(patient_id).await?;
    let reservations = store.reservations_for_patient(patient_id).await?;
    let reorders = store.reorders_for_patient(patient_id).await?;
    let orders = store.orders_for_patient(patient_id).await?;

    Ok(PatientSnapshot {
        patient_id: patient_id.to_string(),
        patient,
        intake,
        reservations,
        reorders,
        orders,
        loaded_at: Utc::now(),
    })
}
