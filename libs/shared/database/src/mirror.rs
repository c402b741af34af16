// PostgREST-backed relational mirror.
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::clinic::{
    IntakeRecord, Order, Patient, ReorderRequest, ReorderStatus, Reservation, ReviewUpdate, SlotKey,
};
use shared_models::schedule::{DateOverride, WeeklyRule};

use crate::store::{ClinicStore, StoreError};
use crate::supabase::SupabaseClient;

const RETURN_ROWS: &str = "return=representation";
const UPSERT_ROWS: &str = "resolution=merge-duplicates,return=representation";
const INSERT_IF_ABSENT: &str = "resolution=ignore-duplicates,return=representation";

pub struct SupabaseClinicStore {
    supabase: SupabaseClient,
}

impl SupabaseClinicStore {
    pub fn new(config: &AppConfig) -> Result<Self, StoreError> {
        let supabase = SupabaseClient::new(config).map_err(|e| StoreError::Request(e.to_string()))?;
        Ok(Self { supabase })
    }

    pub fn with_client(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, StoreError> {
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, None)
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        decode_rows(rows)
    }

    async fn fetch_one<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StoreError> {
        Ok(self.fetch(path).await?.into_iter().next())
    }

    async fn write(
        &self,
        method: Method,
        path: &str,
        body: Value,
        prefer: &'static str,
    ) -> Result<Vec<Value>, StoreError> {
        self.supabase
            .request_with_prefer(method, path, Some(body), Some(prefer))
            .await
            .map_err(|e| StoreError::Request(e.to_string()))
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", urlencoding::encode(value))
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Decode(e.to_string()))
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| StoreError::Decode(e.to_string()))
}

fn first_row<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Option<T>, StoreError> {
    Ok(decode_rows(rows)?.into_iter().next())
}

#[async_trait]
impl ClinicStore for SupabaseClinicStore {
    async fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>, StoreError> {
        self.fetch_one(&format!("/rest/v1/patients?patient_id={}&limit=1", eq(patient_id)))
            .await
    }

    async fn upsert_patient(&self, patient: &Patient) -> Result<(), StoreError> {
        self.write(
            Method::POST,
            "/rest/v1/patients?on_conflict=patient_id",
            to_body(patient)?,
            UPSERT_ROWS,
        )
        .await?;
        Ok(())
    }

    async fn find_intake_by_patient(&self, patient_id: &str) -> Result<Option<IntakeRecord>, StoreError> {
        self.fetch_one(&format!(
            "/rest/v1/intakes?patient_id={}&order=submitted_at.asc&limit=1",
            eq(patient_id)
        ))
        .await
    }

    async fn find_intake_by_reserve_id(&self, reserve_id: &str) -> Result<Option<IntakeRecord>, StoreError> {
        self.fetch_one(&format!("/rest/v1/intakes?reserve_id={}&limit=1", eq(reserve_id)))
            .await
    }

    async fn insert_intake(&self, intake: &IntakeRecord) -> Result<(), StoreError> {
        self.write(Method::POST, "/rest/v1/intakes", to_body(intake)?, RETURN_ROWS)
            .await?;
        Ok(())
    }

    async fn link_intake_reservation(&self, intake_id: Uuid, reserve_id: Option<&str>) -> Result<(), StoreError> {
        let rows = self
            .write(
                Method::PATCH,
                &format!("/rest/v1/intakes?intake_id=eq.{}", intake_id),
                json!({ "reserve_id": reserve_id, "updated_at": Utc::now() }),
                RETURN_ROWS,
            )
            .await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound(format!("intake {}", intake_id)));
        }
        Ok(())
    }

    async fn apply_review(&self, intake_id: Uuid, update: &ReviewUpdate) -> Result<IntakeRecord, StoreError> {
        let rows = self
            .write(
                Method::PATCH,
                &format!("/rest/v1/intakes?intake_id=eq.{}", intake_id),
                to_body(update)?,
                RETURN_ROWS,
            )
            .await?;
        first_row(rows)?.ok_or_else(|| StoreError::NotFound(format!("intake {}", intake_id)))
    }

    async fn weekly_rules(&self, doctor_id: &str) -> Result<Vec<WeeklyRule>, StoreError> {
        self.fetch(&format!(
            "/rest/v1/weekly_rules?doctor_id={}&order=day_of_week.asc",
            eq(doctor_id)
        ))
        .await
    }

    async fn date_overrides(
        &self,
        doctor_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DateOverride>, StoreError> {
        self.fetch(&format!(
            "/rest/v1/date_overrides?doctor_id={}&date=gte.{}&date=lte.{}",
            eq(doctor_id),
            from,
            to
        ))
        .await
    }

    async fn get_reservation(&self, reserve_id: &str) -> Result<Option<Reservation>, StoreError> {
        self.fetch_one(&format!("/rest/v1/reservations?reserve_id={}&limit=1", eq(reserve_id)))
            .await
    }

    async fn reservations_for_patient(&self, patient_id: &str) -> Result<Vec<Reservation>, StoreError> {
        self.fetch(&format!(
            "/rest/v1/reservations?patient_id={}&order=created_at.desc",
            eq(patient_id)
        ))
        .await
    }

    async fn count_active_reservations(&self, slot: &SlotKey) -> Result<u32, StoreError> {
        let rows: Vec<Value> = self
            .fetch(&format!(
                "/rest/v1/reservations?select=reserve_id&doctor_id={}&date=eq.{}&time=eq.{}&status=eq.pending",
                eq(&slot.doctor_id),
                slot.date,
                slot.time.format("%H:%M:%S")
            ))
            .await?;
        Ok(rows.len() as u32)
    }

    async fn active_reservations_between(
        &self,
        doctor_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError> {
        self.fetch(&format!(
            "/rest/v1/reservations?doctor_id={}&date=gte.{}&date=lte.{}&status=eq.pending",
            eq(doctor_id),
            from,
            to
        ))
        .await
    }

    async fn insert_reservation(&self, reservation: &Reservation) -> Result<(), StoreError> {
        self.write(Method::POST, "/rest/v1/reservations", to_body(reservation)?, RETURN_ROWS)
            .await?;
        Ok(())
    }

    async fn cancel_reservation(
        &self,
        reserve_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Reservation>, StoreError> {
        let rows = self
            .write(
                Method::PATCH,
                &format!("/rest/v1/reservations?reserve_id={}&status=eq.pending", eq(reserve_id)),
                json!({ "status": "canceled", "canceled_at": at }),
                RETURN_ROWS,
            )
            .await?;

        match first_row(rows)? {
            Some(reservation) => Ok(Some(reservation)),
            // Already canceled (or missing): report what is stored.
            None => self.get_reservation(reserve_id).await,
        }
    }

    async fn get_reorder(&self, reorder_id: &str) -> Result<Option<ReorderRequest>, StoreError> {
        self.fetch_one(&format!("/rest/v1/reorders?reorder_id={}&limit=1", eq(reorder_id)))
            .await
    }

    async fn reorders_for_patient(&self, patient_id: &str) -> Result<Vec<ReorderRequest>, StoreError> {
        self.fetch(&format!(
            "/rest/v1/reorders?patient_id={}&order=created_at.desc",
            eq(patient_id)
        ))
        .await
    }

    async fn insert_reorder(&self, reorder: &ReorderRequest) -> Result<(), StoreError> {
        self.write(Method::POST, "/rest/v1/reorders", to_body(reorder)?, RETURN_ROWS)
            .await?;
        Ok(())
    }

    async fn transition_reorder(
        &self,
        reorder_id: &str,
        from: ReorderStatus,
        to: ReorderStatus,
        doctor_note: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Option<ReorderRequest>, StoreError> {
        let mut body = json!({ "status": to, "updated_at": at });
        if let Some(note) = doctor_note {
            body["doctor_note"] = json!(note);
        }

        let rows = self
            .write(
                Method::PATCH,
                &format!("/rest/v1/reorders?reorder_id={}&status=eq.{}", eq(reorder_id), from),
                body,
                RETURN_ROWS,
            )
            .await?;
        first_row(rows)
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, StoreError> {
        self.fetch_one(&format!("/rest/v1/orders?order_id={}&limit=1", eq(order_id)))
            .await
    }

    async fn orders_for_patient(&self, patient_id: &str) -> Result<Vec<Order>, StoreError> {
        self.fetch(&format!(
            "/rest/v1/orders?patient_id={}&order=created_at.desc",
            eq(patient_id)
        ))
        .await
    }

    async fn insert_order_if_absent(&self, order: &Order) -> Result<bool, StoreError> {
        let rows = self
            .write(
                Method::POST,
                "/rest/v1/orders?on_conflict=order_id",
                to_body(order)?,
                INSERT_IF_ABSENT,
            )
            .await?;
        debug!("Order {} insert-if-absent returned {} rows", order.order_id, rows.len());
        Ok(!rows.is_empty())
    }

    async fn update_order_if_revision(&self, order: &Order, expected_revision: i64) -> Result<bool, StoreError> {
        let rows = self
            .write(
                Method::PATCH,
                &format!(
                    "/rest/v1/orders?order_id={}&revision=eq.{}",
                    eq(&order.order_id),
                    expected_revision
                ),
                to_body(order)?,
                RETURN_ROWS,
            )
            .await?;
        Ok(!rows.is_empty())
    }
}
