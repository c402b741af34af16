use chrono::{NaiveDate, NaiveTime, Utc};

use shared_database::{ClinicStore, MemoryClinicStore, StoreError};
use shared_models::clinic::{
    Order, PaymentStatus, ReorderRequest, ReorderStatus, Reservation, ReservationStatus, ShippingStatus,
    SlotKey,
};

fn reservation(id: &str, patient: &str) -> Reservation {
    Reservation {
        reserve_id: id.to_string(),
        patient_id: patient.to_string(),
        doctor_id: "dr_a".to_string(),
        date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        status: ReservationStatus::Pending,
        created_at: Utc::now(),
        canceled_at: None,
    }
}

#[tokio::test]
async fn test_canceled_reservations_do_not_count_toward_slot() {
    let store = MemoryClinicStore::new();
    store.insert_reservation(&reservation("r1", "P1")).await.unwrap();
    store.insert_reservation(&reservation("r2", "P2")).await.unwrap();

    let slot = SlotKey::new(
        "dr_a",
        NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
    );
    assert_eq!(store.count_active_reservations(&slot).await.unwrap(), 2);

    store.cancel_reservation("r1", Utc::now()).await.unwrap();
    assert_eq!(store.count_active_reservations(&slot).await.unwrap(), 1);

    // cancelling twice keeps the first cancellation timestamp
    let first = store.get_reservation("r1").await.unwrap().unwrap().canceled_at;
    store.cancel_reservation("r1", Utc::now()).await.unwrap();
    let second = store.get_reservation("r1").await.unwrap().unwrap().canceled_at;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_reorder_transition_is_compare_and_set() {
    let store = MemoryClinicStore::new();
    store
        .insert_reorder(&ReorderRequest {
            reorder_id: "ro1".to_string(),
            patient_id: "P1".to_string(),
            product_code: "MJ_5".to_string(),
            status: ReorderStatus::Pending,
            doctor_note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

    let wrong_from = store
        .transition_reorder("ro1", ReorderStatus::Confirmed, ReorderStatus::Paid, None, Utc::now())
        .await
        .unwrap();
    assert!(wrong_from.is_none());

    let confirmed = store
        .transition_reorder("ro1", ReorderStatus::Pending, ReorderStatus::Confirmed, Some("ok"), Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(confirmed.status, ReorderStatus::Confirmed);
    assert_eq!(confirmed.doctor_note.as_deref(), Some("ok"));
}

#[tokio::test]
async fn test_order_revision_guard() {
    let store = MemoryClinicStore::new();
    let mut order = Order {
        order_id: "ord_1".to_string(),
        patient_id: Some("P1".to_string()),
        amount: 5000,
        payment_status: PaymentStatus::Unpaid,
        refunded_amount: 0,
        applied_refund_ids: vec![],
        reorder_id: None,
        product_code: None,
        shipping_status: ShippingStatus::Pending,
        tracking_number: None,
        carrier: None,
        paid_at: None,
        refunded_at: None,
        canceled_at: None,
        revision: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    assert!(store.insert_order_if_absent(&order).await.unwrap());
    assert!(!store.insert_order_if_absent(&order).await.unwrap());

    order.payment_status = PaymentStatus::Paid;
    order.revision = 1;
    assert!(store.update_order_if_revision(&order, 0).await.unwrap());
    assert!(!store.update_order_if_revision(&order, 0).await.unwrap());
}

#[tokio::test]
async fn test_write_failure_toggle() {
    let store = MemoryClinicStore::new();
    store.set_write_failure(true);
    let result = store.insert_reservation(&reservation("r1", "P1")).await;
    assert!(matches!(result, Err(StoreError::Request(_))));
    store.set_write_failure(false);
    assert!(store.insert_reservation(&reservation("r1", "P1")).await.is_ok());
}
