use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use cache_cell::CacheConsistencyService;
use shared_config::AppConfig;
use shared_database::ClinicStore;
use shared_models::clinic::{Order, ReorderStatus};
use shared_utils::signature::SignatureVerifier;

use crate::error::WebhookError;
use crate::models::{EventKind, GatewayEvent, OrderEvent, Reconciliation, RefundState, WebhookAck};
use crate::services::note::parse_note;
use crate::services::reconcile::{classify, reconcile};

const MAX_CAS_ATTEMPTS: usize = 8;

pub struct WebhookReconciler {
    store: Arc<dyn ClinicStore>,
    cache: Arc<CacheConsistencyService>,
    verifier: SignatureVerifier,
}

impl WebhookReconciler {
    pub fn new(store: Arc<dyn ClinicStore>, cache: Arc<CacheConsistencyService>, verifier: SignatureVerifier) -> Self {
        Self { store, cache, verifier }
    }

    pub fn from_config(store: Arc<dyn ClinicStore>, cache: Arc<CacheConsistencyService>, config: &AppConfig) -> Self {
        let verifier = SignatureVerifier::new(
            config.webhook_signature_keys.clone(),
            config.webhook_notification_url.clone(),
        );
        Self::new(store, cache, verifier)
    }

    /// Handles one gateway delivery end to end.
    ///
    /// Returns only after the order, any linked reorder and the patient's
    /// cached read models are all up to date.
    #[instrument(skip(self, body, signature))]
    pub async fn handle(
        &self,
        body: &[u8],
        signature: Option<&str>,
        event_type: Option<&str>,
    ) -> Result<WebhookAck, WebhookError> {
        if let Err(err) = self.verifier.verify(body, signature) {
            warn!("Rejected webhook delivery: {}", err);
            return Err(err.into());
        }

        // A signed body that does not parse will not parse on redelivery
        // either, so it is acknowledged rather than bounced back for retries.
        let raw: Value = match serde_json::from_slice(body) {
            Ok(raw) => raw,
            Err(err) => {
                error!("Signed webhook body is not JSON, acknowledging: {}", err);
                return Ok(WebhookAck::ignored("body is not JSON"));
            }
        };

        let Some(event_type) = event_type
            .or_else(|| raw.get("type").and_then(Value::as_str))
            .map(str::to_string)
            .filter(|t| !t.trim().is_empty())
        else {
            warn!("Webhook without an event type, acknowledging");
            return Ok(WebhookAck::ignored("missing event type"));
        };

        let status = raw.pointer("/data/status").and_then(Value::as_str);
        let Some(kind) = classify(&event_type, status) else {
            debug!("Ignoring gateway event {}", event_type);
            return Ok(WebhookAck::ignored(format!("unhandled event type {}", event_type)));
        };

        // Only events this system acts on have to match the typed payload.
        let event: GatewayEvent = match serde_json::from_value(raw) {
            Ok(event) => event,
            Err(err) => {
                error!("Gateway event {} has an unexpected payload, acknowledging: {}", event_type, err);
                return Ok(WebhookAck::ignored(format!("malformed {} payload", event_type)));
            }
        };

        let Some(order_id) = event.data.order_id.clone().filter(|id| !id.trim().is_empty()) else {
            warn!("Gateway event {} has no order id, acknowledging", event_type);
            return Ok(WebhookAck::ignored("missing order id"));
        };

        let order_event = OrderEvent {
            kind,
            order_id,
            event_id: event.event_id.clone(),
            amount: event.data.amount,
            refund_id: event.data.refund_id.clone(),
            refund_amount: event.data.refund_amount,
            refund_state: RefundState::parse(event.data.refund_status.as_deref()),
            note: event.data.note.as_deref().map(parse_note).unwrap_or_default(),
        };

        if kind == EventKind::Refund && order_event.refund_key().is_none() {
            warn!("Refund for order {} carries no refund or event id", order_event.order_id);
            return Ok(WebhookAck::ignored("refund without an idempotency id"));
        }

        self.apply(order_event).await
    }

    async fn apply(&self, event: OrderEvent) -> Result<WebhookAck, WebhookError> {
        let (order, changed) = self.commit(&event).await?;

        let mut patients = BTreeSet::new();
        patients.extend(order.patient_id.clone());
        if let Some(reorder_id) = &order.reorder_id {
            patients.extend(self.step_reorder(reorder_id, event.kind, &order).await?);
        }

        // Replays invalidate too: the delivery that changed the order may have
        // failed before its own invalidation finished.
        for patient_id in &patients {
            self.cache.invalidate(patient_id).await?;
        }

        Ok(WebhookAck::Processed {
            order_id: order.order_id,
            payment_status: order.payment_status,
            changed,
        })
    }

    /// Insert-if-absent or compare-and-set on the revision, retried until the
    /// event is folded into whatever the latest stored order is.
    async fn commit(&self, event: &OrderEvent) -> Result<(Order, bool), WebhookError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let current = self.store.get_order(&event.order_id).await?;

            match reconcile(current.as_ref(), event, Utc::now()) {
                Reconciliation::Unchanged => {
                    debug!("Order {} already reflects {:?}", event.order_id, event.kind);
                    if let Some(order) = current {
                        return Ok((order, false));
                    }
                }
                Reconciliation::Create(order) => {
                    if self.store.insert_order_if_absent(&order).await? {
                        info!(
                            patient_id = ?order.patient_id,
                            "Order {} created as {}", order.order_id, order.payment_status
                        );
                        return Ok((order, true));
                    }
                }
                Reconciliation::Update(order) => {
                    let expected = current.as_ref().map_or(0, |c| c.revision);
                    if self.store.update_order_if_revision(&order, expected).await? {
                        info!(
                            patient_id = ?order.patient_id,
                            "Order {} is now {} (refunded {})", order.order_id, order.payment_status, order.refunded_amount
                        );
                        return Ok((order, true));
                    }
                }
            }
            debug!("Order {} moved underneath attempt {}, retrying", event.order_id, attempt);
        }

        Err(WebhookError::Contended(event.order_id.clone()))
    }

    /// Keeps the reorder linked to an order in step with its payment.
    /// Returns the reorder's patient so its read models get invalidated too.
    async fn step_reorder(
        &self,
        reorder_id: &str,
        kind: EventKind,
        order: &Order,
    ) -> Result<Option<String>, WebhookError> {
        let Some(reorder) = self.store.get_reorder(reorder_id).await? else {
            warn!("Order {} names unknown reorder {}", order.order_id, reorder_id);
            return Ok(None);
        };

        let target = match kind {
            EventKind::Cancel => ReorderStatus::Canceled,
            _ if order.paid_at.is_some() => ReorderStatus::Paid,
            _ => return Ok(Some(reorder.patient_id)),
        };

        if reorder.status == target || reorder.status.is_terminal() {
            return Ok(Some(reorder.patient_id));
        }
        if !reorder.status.can_transition_to(&target) {
            warn!(
                patient_id = %reorder.patient_id,
                "Reorder {} is {} and cannot follow order {} to {}", reorder_id, reorder.status, order.order_id, target
            );
            return Ok(Some(reorder.patient_id));
        }

        match self
            .store
            .transition_reorder(reorder_id, reorder.status, target, None, Utc::now())
            .await?
        {
            Some(updated) => info!(patient_id = %updated.patient_id, "Reorder {} is now {}", reorder_id, target),
            None => warn!("Reorder {} changed while following order {}", reorder_id, order.order_id),
        }
        Ok(Some(reorder.patient_id))
    }
}
