use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    api::state::AppState,
    domain::{Booking, CreateBookingRequest, PaymentProof, SubmitProofRequest},
    error::Result,
    service::{BookingView, RefundQuote},
};

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>)> {
    let booking = state.service_context.booking_service
        .create_booking(request)
        .await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

/// Guest-facing receipt.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BookingView>> {
    let view = state.service_context.booking_service
        .get_with_status(id)
        .await?;

    Ok(Json(view))
}

pub async fn submit_proof(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<SubmitProofRequest>,
) -> Result<(StatusCode, Json<PaymentProof>)> {
    let proof = state.service_context.payment_proof_service
        .submit_proof(id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(proof)))
}

pub async fn refund_quote(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RefundQuote>> {
    let quote = state.service_context.refund_service
        .quote(id, chrono::Utc::now())
        .await?;

    Ok(Json(quote))
}
