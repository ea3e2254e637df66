mod common;

use std::sync::Arc;

use lagoon::{
    domain::{BookingStatus, PaymentOutcome, PaymentStatus},
    error::AppError,
    payments::webhook::sign,
    repository::{
        BookingRepository, SqliteBookingRepository, SqliteWebhookEventRepository,
        WebhookEventRepository,
    },
    service::{webhook_service::WebhookService, WebhookOutcome},
};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use common::{booking_request, paid_booking, test_pool};

fn event(id: &str, event_type: &str, resource: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "data": {
            "id": id,
            "type": "event",
            "attributes": { "type": event_type, "data": resource }
        }
    }))
    .unwrap()
}

fn payment_resource(payment_intent_id: &str) -> Value {
    json!({
        "id": "pay_1",
        "type": "payment",
        "attributes": { "payment_intent_id": payment_intent_id, "status": "paid" }
    })
}

fn service(pool: &SqlitePool, secret: Option<&str>) -> (Arc<SqliteBookingRepository>, WebhookService) {
    let repo = Arc::new(SqliteBookingRepository::new(pool.clone()));
    let events = Arc::new(SqliteWebhookEventRepository::new(pool.clone()));
    let service = WebhookService::new(repo.clone(), events, secret.map(str::to_string));
    (repo, service)
}

#[tokio::test]
async fn test_payment_paid_confirms_booking() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let (repo, service) = service(&pool, None);

    let booking = repo.create(booking_request(10000, 5)).await?;
    let payload = event("evt_1", "payment.paid", payment_resource("pi_test_10000_5"));

    let outcome = service.handle(&payload, None).await?;
    assert_eq!(outcome, WebhookOutcome::Applied {
        booking_id: booking.id,
        outcome: PaymentOutcome::Paid,
    });

    let stored = repo.find_by_id(booking.id).await?.unwrap();
    assert_eq!(stored.payment_status, Some(PaymentStatus::Paid));
    assert_eq!(stored.status, Some(BookingStatus::Confirmed));

    Ok(())
}

#[tokio::test]
async fn test_redelivery_is_acknowledged_without_effect() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let (repo, service) = service(&pool, None);

    repo.create(booking_request(10000, 5)).await?;
    let payload = event("evt_1", "payment.paid", payment_resource("pi_test_10000_5"));

    service.handle(&payload, None).await?;
    let again = service.handle(&payload, None).await?;
    assert_eq!(again, WebhookOutcome::Duplicate);

    Ok(())
}

#[tokio::test]
async fn test_same_outcome_under_new_event_id_changes_nothing() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let (repo, service) = service(&pool, None);

    let booking = repo.create(booking_request(10000, 5)).await?;

    service
        .handle(&event("evt_1", "payment.paid", payment_resource("pi_test_10000_5")), None)
        .await?;
    let outcome = service
        .handle(
            &event(
                "evt_2",
                "payment_intent.succeeded",
                json!({ "id": "pi_test_10000_5", "type": "payment_intent", "attributes": {} }),
            ),
            None,
        )
        .await?;

    assert_eq!(outcome, WebhookOutcome::AlreadySettled { booking_id: booking.id });

    Ok(())
}

#[tokio::test]
async fn test_late_failure_does_not_downgrade_paid_booking() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let (repo, service) = service(&pool, None);

    let booking = paid_booking(repo.as_ref(), 10000, 5).await?;
    let intent = booking.payment_intent_id.clone().unwrap();

    for (id, event_type) in [
        ("evt_f1", "payment.failed"),
        ("evt_f2", "payment_intent.processing"),
        ("evt_f3", "source.expired"),
        ("evt_f4", "payment_intent.cancelled"),
    ] {
        let outcome = service.handle(&event(id, event_type, payment_resource(&intent)), None).await?;
        assert_eq!(outcome, WebhookOutcome::AlreadySettled { booking_id: booking.id });
    }

    let stored = repo.find_by_id(booking.id).await?.unwrap();
    assert_eq!(stored.payment_status, Some(PaymentStatus::Paid));
    assert_eq!(stored.status, Some(BookingStatus::Confirmed));

    Ok(())
}

#[tokio::test]
async fn test_failure_marks_booking_payment_failed() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let (repo, service) = service(&pool, None);

    let booking = repo.create(booking_request(10000, 5)).await?;
    service
        .handle(&event("evt_1", "payment.failed", payment_resource("pi_test_10000_5")), None)
        .await?;

    let stored = repo.find_by_id(booking.id).await?.unwrap();
    assert_eq!(stored.payment_status, Some(PaymentStatus::Failed));
    assert_eq!(stored.status, Some(BookingStatus::PaymentFailed));

    Ok(())
}

#[tokio::test]
async fn test_source_cancelled_cancels_booking() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let (repo, service) = service(&pool, None);

    let booking = repo.create(booking_request(10000, 5)).await?;
    let resource = json!({
        "id": "src_1",
        "type": "source",
        "attributes": { "metadata": { "booking_id": booking.id.to_string() } }
    });
    service.handle(&event("evt_1", "source.cancelled", resource), None).await?;

    let stored = repo.find_by_id(booking.id).await?.unwrap();
    assert_eq!(stored.payment_status, Some(PaymentStatus::Failed));
    assert_eq!(stored.status, Some(BookingStatus::Cancelled));

    Ok(())
}

#[tokio::test]
async fn test_unknown_event_type_is_ignored() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let (_repo, service) = service(&pool, None);

    let payload = event("evt_1", "checkout_session.payment.paid", json!({ "id": "cs_1" }));
    assert_eq!(service.handle(&payload, None).await?, WebhookOutcome::Ignored);

    Ok(())
}

#[tokio::test]
async fn test_unknown_booking_is_acknowledged_and_recorded() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let (_repo, service) = service(&pool, None);

    let payload = event("evt_1", "payment.paid", payment_resource("pi_nobody"));
    assert_eq!(service.handle(&payload, None).await?, WebhookOutcome::BookingNotFound);

    let events = SqliteWebhookEventRepository::new(pool.clone());
    assert!(events.is_processed("evt_1").await?);

    Ok(())
}

#[tokio::test]
async fn test_signature_is_enforced_when_secret_is_set() -> anyhow::Result<()> {
    let pool = test_pool().await?;
    let (repo, service) = service(&pool, Some("whsk_test"));

    let booking = repo.create(booking_request(10000, 5)).await?;
    let payload = event("evt_1", "payment.paid", payment_resource("pi_test_10000_5"));

    let missing = service.handle(&payload, None).await;
    assert!(matches!(missing, Err(AppError::BadRequest(_))));

    let forged = service.handle(&payload, Some("t=1700000000,te=deadbeef,li=")).await;
    assert!(matches!(forged, Err(AppError::BadRequest(_))));

    // Rejected deliveries leave the booking alone
    let stored = repo.find_by_id(booking.id).await?.unwrap();
    assert_eq!(stored.payment_status, Some(PaymentStatus::Pending));

    let sig = sign(&payload, "1700000000", "whsk_test")?;
    let header = format!("t=1700000000,te=,li={}", sig);
    let outcome = service.handle(&payload, Some(&header)).await?;
    assert!(matches!(outcome, WebhookOutcome::Applied { .. }));

    Ok(())
}
