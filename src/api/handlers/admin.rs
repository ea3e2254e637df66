use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    api::{middleware::auth::CurrentAdmin, state::AppState},
    domain::{Booking, PaymentProof, RefundStatus, RefundType},
    error::Result,
    service::{BookingView, RefundCommand, RefundOutcome, SyncResult},
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    bookings: Vec<BookingView>,
    count: usize,
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let bookings = state.service_context.booking_service
        .list_with_status(params.limit.clamp(1, 200), params.offset.max(0))
        .await?;

    let count = bookings.len();

    Ok(Json(ListResponse { bookings, count }))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<i64>,
) -> Result<Json<Booking>> {
    let booking = state.service_context.booking_service
        .cancel_booking(id)
        .await?;

    tracing::info!(booking_id = id, admin = %admin.name, "Admin cancelled booking");

    Ok(Json(booking))
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundRequestDto {
    refund_type: Option<RefundType>,
    refund_amount: Option<Decimal>,
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    success: bool,
    warning: bool,
    booking_id: i64,
    refund_id: Option<String>,
    amount: Decimal,
    status: RefundStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl From<RefundOutcome> for RefundResponse {
    fn from(outcome: RefundOutcome) -> Self {
        let (receipt, message) = match outcome {
            RefundOutcome::Completed(receipt) => (receipt, None),
            RefundOutcome::PartialFailure { receipt, message } => (receipt, Some(message)),
        };

        Self {
            success: true,
            warning: message.is_some(),
            booking_id: receipt.booking_id,
            refund_id: receipt.refund_id,
            amount: receipt.amount,
            status: receipt.status,
            message,
        }
    }
}

/// Issues a refund. A partial failure still answers 200 because the money
/// has moved; the `warning` flag tells the caller not to retry.
pub async fn refund_booking(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<i64>,
    body: Option<Json<RefundRequestDto>>,
) -> Result<Json<RefundResponse>> {
    let Json(dto) = body.unwrap_or_default();

    let command = RefundCommand {
        refund_type: dto.refund_type,
        refund_amount: dto.refund_amount,
        reason: dto.reason,
        processed_by: admin.name,
    };

    let outcome = state.service_context.refund_service
        .process_refund(id, command, chrono::Utc::now())
        .await?;

    Ok(Json(outcome.into()))
}

pub async fn sync_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SyncResult>> {
    let result = state.service_context.booking_service
        .sync_payment_intent(id)
        .await?;

    Ok(Json(result))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewDto {
    notes: Option<String>,
}

pub async fn verify_proof(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<i64>,
    body: Option<Json<ReviewDto>>,
) -> Result<Json<PaymentProof>> {
    let Json(dto) = body.unwrap_or_default();

    let proof = state.service_context.payment_proof_service
        .verify_proof(id, &admin.name, dto.notes, chrono::Utc::now())
        .await?;

    Ok(Json(proof))
}

pub async fn reject_proof(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Path(id): Path<i64>,
    body: Option<Json<ReviewDto>>,
) -> Result<Json<PaymentProof>> {
    let Json(dto) = body.unwrap_or_default();

    let proof = state.service_context.payment_proof_service
        .reject_proof(id, &admin.name, dto.notes, chrono::Utc::now())
        .await?;

    Ok(Json(proof))
}
