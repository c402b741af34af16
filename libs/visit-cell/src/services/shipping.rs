use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use cache_cell::CacheConsistencyService;
use shared_database::ClinicStore;
use shared_models::clinic::{Order, ShippingStatus};
use shared_utils::validation::non_empty;

use crate::error::VisitError;

const MAX_CAS_ATTEMPTS: usize = 5;

/// Operator shipping actions on paid orders. Forward-only.
pub struct ShippingService {
    store: Arc<dyn ClinicStore>,
    cache: Arc<CacheConsistencyService>,
}

impl ShippingService {
    pub fn new(store: Arc<dyn ClinicStore>, cache: Arc<CacheConsistencyService>) -> Self {
        Self { store, cache }
    }

    #[instrument(skip(self))]
    pub async fn mark_shipped(&self, order_id: &str, tracking_number: &str, carrier: &str) -> Result<Order, VisitError> {
        let tracking_number = non_empty(Some(tracking_number.to_string()))
            .ok_or_else(|| VisitError::Validation("tracking_number is required".to_string()))?;
        let carrier = non_empty(Some(carrier.to_string()))
            .ok_or_else(|| VisitError::Validation("carrier is required".to_string()))?;

        self.advance(order_id, ShippingStatus::Shipped, |order| {
            order.tracking_number = Some(tracking_number.clone());
            order.carrier = Some(carrier.clone());
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn mark_delivered(&self, order_id: &str) -> Result<Order, VisitError> {
        self.advance(order_id, ShippingStatus::Delivered, |_| {}).await
    }

    async fn advance<F>(&self, order_id: &str, target: ShippingStatus, apply: F) -> Result<Order, VisitError>
    where
        F: Fn(&mut Order),
    {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let current = self
                .store
                .get_order(order_id)
                .await?
                .ok_or_else(|| VisitError::NotFound(format!("order {}", order_id)))?;

            if !current.is_paid() {
                return Err(VisitError::InvalidTransition(format!(
                    "order {} is {}, only paid orders ship",
                    order_id, current.payment_status
                )));
            }
            if current.shipping_status >= target {
                debug!("Order {} already {}", order_id, current.shipping_status);
                return Ok(current);
            }
            let required = match target {
                ShippingStatus::Delivered => ShippingStatus::Shipped,
                _ => ShippingStatus::Pending,
            };
            if current.shipping_status != required {
                return Err(VisitError::InvalidTransition(format!(
                    "order {} is {}, cannot become {}",
                    order_id, current.shipping_status, target
                )));
            }

            let mut next = current.clone();
            apply(&mut next);
            next.shipping_status = target;
            next.revision = current.revision + 1;
            next.updated_at = Utc::now();

            if self.store.update_order_if_revision(&next, current.revision).await? {
                info!("Order {} is now {}", order_id, target);
                if let Some(patient_id) = &next.patient_id {
                    self.cache.invalidate(patient_id).await?;
                }
                return Ok(next);
            }
            debug!("Order {} revision moved, retrying", order_id);
        }

        Err(VisitError::InvalidTransition(format!(
            "order {} kept changing during the shipping update",
            order_id
        )))
    }
}
