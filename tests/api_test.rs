mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use lagoon::{
    api::create_app,
    config::Settings,
    domain::RefundPolicy,
    payments::webhook::SIGNATURE_HEADER,
    repository::SqliteBookingRepository,
    service::ServiceContext,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{paid_booking, test_pool, FakeGateway};

const TOKEN: &str = "test-admin-token";

async fn app() -> anyhow::Result<(Router, Arc<FakeGateway>, sqlx::SqlitePool)> {
    let pool = test_pool().await?;
    let gateway = Arc::new(FakeGateway::new());

    let mut settings = Settings::default();
    settings.admin.api_token = Some(TOKEN.to_string());

    let context = Arc::new(ServiceContext::sqlite(
        pool.clone(),
        gateway.clone(),
        RefundPolicy::default(),
        None,
    ));

    Ok((create_app(context, Arc::new(settings)), gateway, pool))
}

async fn send(app: &Router, request: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", TOKEN))
        .header("x-admin-name", "ana")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() -> anyhow::Result<()> {
    let (app, _, _) = app().await?;

    let request = Request::builder().uri("/health").body(Body::empty())?;
    let (status, body) = send(&app, request).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    Ok(())
}

#[tokio::test]
async fn test_create_and_view_booking() -> anyhow::Result<()> {
    let (app, _, _) = app().await?;

    let (status, created) = send(&app, post_json("/api/bookings", json!({
        "guest_name": "Maria Santos",
        "guest_email": "maria@example.com",
        "total_amount": 10000,
        "check_in_date": "2030-01-10",
        "check_out_date": "2030-01-12",
        "payment_intent_id": "pi_api_1"
    }))).await?;
    assert_eq!(status, StatusCode::CREATED);

    let id = created["id"].as_i64().unwrap();
    let request = Request::builder().uri(format!("/api/bookings/{}", id)).body(Body::empty())?;
    let (status, view) = send(&app, request).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["guest_name"], "Maria Santos");
    assert_eq!(view["payment_status"], "pending");
    assert_eq!(view["display_status"], "pending");
    assert!(view["latest_proof"].is_null());

    Ok(())
}

#[tokio::test]
async fn test_invalid_booking_is_unprocessable() -> anyhow::Result<()> {
    let (app, _, _) = app().await?;

    let (status, body) = send(&app, post_json("/api/bookings", json!({
        "guest_name": "Maria Santos",
        "guest_email": "maria@example.com",
        "total_amount": 10000,
        "check_in_date": "2030-01-12",
        "check_out_date": "2030-01-10"
    }))).await?;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Check-out"));

    Ok(())
}

#[tokio::test]
async fn test_missing_booking_is_404() -> anyhow::Result<()> {
    let (app, _, _) = app().await?;

    let request = Request::builder().uri("/api/bookings/12345").body(Body::empty())?;
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_admin_routes_require_token() -> anyhow::Result<()> {
    let (app, _, _) = app().await?;

    let request = Request::builder().uri("/admin/bookings").body(Body::empty())?;
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/admin/bookings")
        .header("authorization", "Bearer wrong")
        .body(Body::empty())?;
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/admin/bookings")
        .header("authorization", format!("Bearer {}", TOKEN))
        .body(Body::empty())?;
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    Ok(())
}

#[tokio::test]
async fn test_admin_list_count_is_page_size() -> anyhow::Result<()> {
    let (app, _, pool) = app().await?;
    let repo = SqliteBookingRepository::new(pool);
    for days in 3..6 {
        paid_booking(&repo, 10000, days).await?;
    }

    let request = Request::builder()
        .uri("/admin/bookings?limit=2&offset=0")
        .header("authorization", format!("Bearer {}", TOKEN))
        .body(Body::empty())?;
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["bookings"].as_array().map(|b| b.len()), Some(2));
    assert!(body.get("total").is_none());

    Ok(())
}

#[tokio::test]
async fn test_admin_refund() -> anyhow::Result<()> {
    let (app, gateway, pool) = app().await?;
    let repo = SqliteBookingRepository::new(pool);
    let booking = paid_booking(&repo, 10000, 4).await?;

    let (status, body) = send(
        &app,
        admin_post(&format!("/admin/bookings/{}/refund", booking.id), json!({})),
    ).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["warning"], false);
    assert_eq!(body["refund_id"], "ref_1");
    assert_eq!(body["status"], "pending");

    let requests = gateway.refund_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].metadata.get("processed_by").map(String::as_str), Some("ana"));

    // Second attempt is refused
    let (status, _) = send(
        &app,
        admin_post(&format!("/admin/bookings/{}/refund", booking.id), json!({})),
    ).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_proof_review_flow() -> anyhow::Result<()> {
    let (app, _, _) = app().await?;

    let (_, created) = send(&app, post_json("/api/bookings", json!({
        "guest_name": "Juan dela Cruz",
        "guest_email": "juan@example.com",
        "total_amount": "7500.50",
        "check_in_date": "2030-02-01",
        "check_out_date": "2030-02-03"
    }))).await?;
    let id = created["id"].as_i64().unwrap();

    let (status, proof) = send(&app, post_json(
        &format!("/api/bookings/{}/proofs", id),
        json!({ "payment_method": "gcash", "reference_number": "GC-778" }),
    )).await?;
    assert_eq!(status, StatusCode::CREATED);
    let proof_id = proof["id"].as_i64().unwrap();

    let (status, reviewed) = send(&app, admin_post(
        &format!("/admin/proofs/{}/verify", proof_id),
        json!({ "notes": "seen in statement" }),
    )).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["status"], "verified");
    assert_eq!(reviewed["verified_by"], "ana");

    let request = Request::builder().uri(format!("/api/bookings/{}", id)).body(Body::empty())?;
    let (_, view) = send(&app, request).await?;
    assert_eq!(view["display_status"], "paid");
    assert_eq!(view["status"], "confirmed");

    Ok(())
}

#[tokio::test]
async fn test_webhook_endpoint() -> anyhow::Result<()> {
    let (app, _, pool) = app().await?;
    let repo = SqliteBookingRepository::new(pool);
    let booking = lagoon::repository::BookingRepository::create(
        &repo,
        common::booking_request(10000, 5),
    ).await?;

    let payload = json!({
        "data": {
            "id": "evt_http_1",
            "attributes": {
                "type": "payment.paid",
                "data": { "id": "pay_1", "attributes": { "payment_intent_id": "pi_test_10000_5" } }
            }
        }
    });

    let request = Request::builder()
        .method("POST")
        .uri("/api/payments/webhook")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, "t=1,te=,li=")
        .body(Body::from(payload.to_string()))?;
    let (status, body) = send(&app, request).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "applied");
    assert_eq!(body["booking_id"], booking.id);

    let (status, body) = send(&app, post_json("/api/payments/webhook", payload)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "duplicate");

    let (status, _) = send(&app, post_json("/api/payments/webhook", json!("garbage"))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_refund_quote() -> anyhow::Result<()> {
    let (app, _, pool) = app().await?;
    let repo = SqliteBookingRepository::new(pool);
    let booking = paid_booking(&repo, 10000, 4).await?;

    let request = Request::builder()
        .uri(format!("/api/bookings/{}/refund-quote", booking.id))
        .body(Body::empty())?;
    let (status, quote) = send(&app, request).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["eligible"], true);
    assert_eq!(quote["refund_amount"], "5000");

    Ok(())
}
