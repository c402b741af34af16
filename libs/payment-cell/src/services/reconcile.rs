use chrono::{DateTime, Utc};

use shared_models::clinic::{Order, PaymentStatus, ShippingStatus};

use crate::models::{EventKind, OrderEvent, Reconciliation, RefundState};

/// Maps a gateway event type (plus the reported payment status for generic
/// `payment.updated` events) to the kinds this system acts on.
pub fn classify(event_type: &str, status: Option<&str>) -> Option<EventKind> {
    let event_type = event_type.trim().to_ascii_lowercase().replace('_', ".");
    let status = status.map(|s| s.trim().to_ascii_lowercase());

    match event_type.as_str() {
        "payment.completed" | "payment.succeeded" | "payment.paid" | "charge.succeeded" => {
            Some(EventKind::PaymentCompleted)
        }
        "refund.created" | "refund.updated" | "refund.completed" | "payment.refunded" | "charge.refunded" => {
            Some(EventKind::Refund)
        }
        "payment.canceled" | "payment.cancelled" | "order.canceled" | "order.cancelled" => Some(EventKind::Cancel),
        "payment.updated" | "payment.created" => match status.as_deref() {
            Some("completed") | Some("approved") | Some("paid") => Some(EventKind::PaymentCompleted),
            Some("canceled") | Some("cancelled") => Some(EventKind::Cancel),
            _ => None,
        },
        _ => None,
    }
}

/// Folds one event into the stored order.
///
/// Status never moves backwards and every refund id is counted once, so a
/// replayed or reordered delivery converges on the same order.
pub fn reconcile(current: Option<&Order>, event: &OrderEvent, now: DateTime<Utc>) -> Reconciliation {
    let base = match current {
        Some(order) => order.clone(),
        None => new_order(event, now),
    };
    let mut next = base.clone();

    if next.amount == 0 {
        if let Some(amount) = event.amount.filter(|a| *a > 0) {
            next.amount = amount;
        }
    }
    if next.patient_id.is_none() {
        next.patient_id = event.note.patient_id.clone();
    }
    if next.product_code.is_none() {
        next.product_code = event.note.product_code.clone();
    }
    if next.reorder_id.is_none() {
        next.reorder_id = event.note.reorder_id.clone();
    }

    match event.kind {
        EventKind::PaymentCompleted => {
            raise_status(&mut next, PaymentStatus::Paid);
            if next.paid_at.is_none() {
                next.paid_at = Some(now);
            }
        }
        EventKind::Refund => apply_refund(&mut next, event, now),
        EventKind::Cancel => {
            if next.canceled_at.is_none() {
                next.canceled_at = Some(now);
            }
            // Only an amount the cancel itself reports is added to the total.
            if let (Some(amount), Some(key)) = (event.refund_amount, event.refund_key()) {
                credit_refund(&mut next, key, amount, now);
            }
        }
    }
    settle_cancellation(&mut next, now);

    match current {
        None => Reconciliation::Create(next),
        Some(_) if next == base => Reconciliation::Unchanged,
        Some(_) => {
            next.revision = base.revision + 1;
            next.updated_at = now;
            Reconciliation::Update(next)
        }
    }
}

fn new_order(event: &OrderEvent, now: DateTime<Utc>) -> Order {
    Order {
        order_id: event.order_id.clone(),
        patient_id: None,
        amount: 0,
        payment_status: PaymentStatus::Unpaid,
        refunded_amount: 0,
        applied_refund_ids: Vec::new(),
        reorder_id: None,
        product_code: None,
        shipping_status: ShippingStatus::Pending,
        tracking_number: None,
        carrier: None,
        paid_at: None,
        refunded_at: None,
        canceled_at: None,
        revision: 1,
        created_at: now,
        updated_at: now,
    }
}

fn raise_status(order: &mut Order, target: PaymentStatus) {
    if order.payment_status < target {
        order.payment_status = target;
    }
}

fn apply_refund(order: &mut Order, event: &OrderEvent, now: DateTime<Utc>) {
    match event.refund_state {
        RefundState::Failed => {}
        RefundState::Pending => raise_status(order, PaymentStatus::RefundPending),
        RefundState::Completed => {
            let Some(key) = event.refund_key() else {
                return;
            };
            let remaining = (order.amount - order.refunded_amount).max(0);
            credit_refund(order, key, event.refund_amount.unwrap_or(remaining), now);
        }
    }
}

/// Adds one refund to the total, once per key, capped at what is left.
fn credit_refund(order: &mut Order, key: &str, requested: i64, now: DateTime<Utc>) {
    if order.applied_refund_ids.iter().any(|id| id == key) {
        return;
    }

    let remaining = (order.amount - order.refunded_amount).max(0);
    let requested = requested.max(0);
    let applied = if order.amount > 0 { requested.min(remaining) } else { requested };

    order.refunded_amount += applied;
    order.applied_refund_ids.push(key.to_string());
    raise_status(order, PaymentStatus::Refunded);
    if order.refunded_at.is_none() {
        order.refunded_at = Some(now);
    }
}

/// A canceled order whose payment was captured ends up refunded, whichever of
/// the two events was delivered first. The refunded total is left alone.
fn settle_cancellation(order: &mut Order, now: DateTime<Utc>) {
    if order.canceled_at.is_none() || order.paid_at.is_none() {
        return;
    }
    raise_status(order, PaymentStatus::Refunded);
    if order.refunded_at.is_none() {
        order.refunded_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteMetadata;

    fn event(kind: EventKind) -> OrderEvent {
        OrderEvent {
            kind,
            order_id: "O1".into(),
            event_id: Some("evt_1".into()),
            amount: Some(5000),
            refund_id: None,
            refund_amount: None,
            refund_state: RefundState::Completed,
            note: NoteMetadata {
                patient_id: Some("P1".into()),
                ..NoteMetadata::default()
            },
        }
    }

    fn refund(refund_id: &str, amount: i64) -> OrderEvent {
        OrderEvent {
            refund_id: Some(refund_id.into()),
            refund_amount: Some(amount),
            ..event(EventKind::Refund)
        }
    }

    fn apply(order: Option<&Order>, event: &OrderEvent) -> Order {
        match reconcile(order, event, Utc::now()) {
            Reconciliation::Create(order) | Reconciliation::Update(order) => order,
            Reconciliation::Unchanged => order.cloned().unwrap(),
        }
    }

    #[test]
    fn test_classifies_event_types() {
        assert_eq!(classify("payment.completed", None), Some(EventKind::PaymentCompleted));
        assert_eq!(classify("PAYMENT_COMPLETED", None), Some(EventKind::PaymentCompleted));
        assert_eq!(classify("refund.updated", None), Some(EventKind::Refund));
        assert_eq!(classify("order.cancelled", None), Some(EventKind::Cancel));
        assert_eq!(classify("payment.updated", Some("COMPLETED")), Some(EventKind::PaymentCompleted));
        assert_eq!(classify("payment.updated", Some("pending")), None);
        assert_eq!(classify("customer.created", None), None);
    }

    #[test]
    fn test_first_event_creates_the_order_from_the_note() {
        let created = reconcile(None, &event(EventKind::PaymentCompleted), Utc::now());
        let Reconciliation::Create(order) = created else {
            panic!("expected create, got {:?}", created);
        };
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.patient_id.as_deref(), Some("P1"));
        assert_eq!(order.amount, 5000);
        assert_eq!(order.revision, 1);
    }

    #[test]
    fn test_replayed_payment_is_unchanged() {
        let paid = apply(None, &event(EventKind::PaymentCompleted));
        assert_eq!(
            reconcile(Some(&paid), &event(EventKind::PaymentCompleted), Utc::now()),
            Reconciliation::Unchanged
        );
    }

    #[test]
    fn test_partial_refunds_accumulate_once_each() {
        let paid = apply(None, &event(EventKind::PaymentCompleted));
        let first = apply(Some(&paid), &refund("rf_1", 1000));
        let second = apply(Some(&first), &refund("rf_2", 1500));
        assert_eq!(second.refunded_amount, 2500);
        assert_eq!(second.payment_status, PaymentStatus::Refunded);
        assert_eq!(second.revision, 3);

        assert_eq!(
            reconcile(Some(&second), &refund("rf_1", 1000), Utc::now()),
            Reconciliation::Unchanged
        );
    }

    #[test]
    fn test_refunds_are_capped_at_the_amount() {
        let paid = apply(None, &event(EventKind::PaymentCompleted));
        let first = apply(Some(&paid), &refund("rf_1", 4000));
        let second = apply(Some(&first), &refund("rf_2", 4000));
        assert_eq!(second.refunded_amount, 5000);
    }

    #[test]
    fn test_late_payment_does_not_undo_a_refund() {
        let paid = apply(None, &event(EventKind::PaymentCompleted));
        let refunded = apply(Some(&paid), &refund("rf_1", 5000));
        let replay = OrderEvent {
            event_id: Some("evt_2".into()),
            ..event(EventKind::PaymentCompleted)
        };
        assert_eq!(reconcile(Some(&refunded), &replay, Utc::now()), Reconciliation::Unchanged);
    }

    #[test]
    fn test_pending_and_failed_refunds() {
        let paid = apply(None, &event(EventKind::PaymentCompleted));
        let pending = apply(
            Some(&paid),
            &OrderEvent {
                refund_state: RefundState::Pending,
                ..refund("rf_1", 5000)
            },
        );
        assert_eq!(pending.payment_status, PaymentStatus::RefundPending);
        assert_eq!(pending.refunded_amount, 0);

        let failed = OrderEvent {
            refund_state: RefundState::Failed,
            ..refund("rf_1", 5000)
        };
        assert_eq!(reconcile(Some(&pending), &failed, Utc::now()), Reconciliation::Unchanged);
    }

    #[test]
    fn test_cancel_after_a_partial_refund_keeps_the_total() {
        let paid = apply(None, &event(EventKind::PaymentCompleted));
        let partly = apply(Some(&paid), &refund("rf_1", 1000));
        let canceled = apply(Some(&partly), &event(EventKind::Cancel));
        assert_eq!(canceled.refunded_amount, 1000);
        assert_eq!(canceled.payment_status, PaymentStatus::Refunded);
        assert!(canceled.canceled_at.is_some());
        assert_eq!(
            reconcile(Some(&canceled), &event(EventKind::Cancel), Utc::now()),
            Reconciliation::Unchanged
        );
    }

    #[test]
    fn test_cancel_with_an_amount_adds_it_once() {
        let paid = apply(None, &event(EventKind::PaymentCompleted));
        let partly = apply(Some(&paid), &refund("rf_1", 1000));
        let cancel = OrderEvent {
            event_id: Some("evt_cancel".into()),
            refund_amount: Some(9000),
            ..event(EventKind::Cancel)
        };
        let canceled = apply(Some(&partly), &cancel);
        assert_eq!(canceled.refunded_amount, 5000);
        assert_eq!(reconcile(Some(&canceled), &cancel, Utc::now()), Reconciliation::Unchanged);
    }

    #[test]
    fn test_cancel_and_payment_converge_in_either_order() {
        let pay = event(EventKind::PaymentCompleted);
        let cancel = event(EventKind::Cancel);

        let paid = apply(None, &pay);
        let in_order = apply(Some(&paid), &cancel);

        let canceled = apply(None, &cancel);
        let reversed = apply(Some(&canceled), &pay);

        assert_eq!(in_order.payment_status, PaymentStatus::Refunded);
        assert_eq!(reversed.payment_status, in_order.payment_status);
        assert_eq!(reversed.refunded_amount, in_order.refunded_amount);
        assert!(reversed.paid_at.is_some() && reversed.canceled_at.is_some());
        assert!(reversed.refunded_at.is_some());
    }

    #[test]
    fn test_cancel_of_an_unpaid_order_only_marks_it() {
        let canceled = apply(None, &event(EventKind::Cancel));
        assert_eq!(canceled.payment_status, PaymentStatus::Unpaid);
        assert_eq!(canceled.refunded_amount, 0);
        assert!(canceled.canceled_at.is_some());
    }
}
