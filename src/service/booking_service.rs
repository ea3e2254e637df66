use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    domain::{
        resolve_status, Booking, CreateBookingRequest, DisplayStatus,
        PaymentOutcome, PaymentProof,
    },
    error::{AppError, Result},
    payments::PaymentGateway,
    repository::{BookingRepository, PaymentProofRepository},
    service::webhook_service::apply_outcome,
};

/// A booking as guests and admins see it: the stored record, the proof that
/// currently counts and the resolved payment status.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub latest_proof: Option<PaymentProof>,
    pub display_status: DisplayStatus,
}

impl BookingView {
    pub fn new(booking: Booking, latest_proof: Option<PaymentProof>) -> Self {
        let display_status =
            resolve_status(booking.payment_status, booking.status, latest_proof.as_ref());
        Self { booking, latest_proof, display_status }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub booking: Booking,
    pub gateway_status: String,
    pub changed: bool,
}

pub struct BookingService {
    booking_repo: Arc<dyn BookingRepository>,
    proof_repo: Arc<dyn PaymentProofRepository>,
    gateway: Arc<dyn PaymentGateway>,
}

impl BookingService {
    pub fn new(
        booking_repo: Arc<dyn BookingRepository>,
        proof_repo: Arc<dyn PaymentProofRepository>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self { booking_repo, proof_repo, gateway }
    }

    pub async fn create_booking(&self, request: CreateBookingRequest) -> Result<Booking> {
        validate(&request)?;

        let booking = self.booking_repo.create(request).await?;
        tracing::info!(booking_id = booking.id, total = %booking.total_amount, "Booking created");

        Ok(booking)
    }

    pub async fn get_with_status(&self, booking_id: i64) -> Result<BookingView> {
        let booking = self.find_booking(booking_id).await?;
        let proof = self.proof_repo.find_latest_for_booking(booking_id).await?;
        Ok(BookingView::new(booking, proof))
    }

    pub async fn list_with_status(&self, limit: i64, offset: i64) -> Result<Vec<BookingView>> {
        let bookings = self.booking_repo.list(limit, offset).await?;

        let mut views = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let proof = self.proof_repo.find_latest_for_booking(booking.id).await?;
            views.push(BookingView::new(booking, proof));
        }

        Ok(views)
    }

    /// Cancels a booking that holds no money. Paid bookings go through the
    /// refund flow instead.
    pub async fn cancel_booking(&self, booking_id: i64) -> Result<Booking> {
        let booking = self.find_booking(booking_id).await?;

        if booking.is_cancelled() {
            return Ok(booking);
        }
        if booking.is_paid() {
            return Err(AppError::InvalidState(
                "Booking has been paid, issue a refund to cancel it".to_string(),
            ));
        }
        if booking.refund_status.is_some() {
            return Err(AppError::Conflict("A refund is recorded on this booking".to_string()));
        }

        let cancelled = self.booking_repo.cancel(booking_id).await?.ok_or_else(|| {
            AppError::Conflict("Booking changed while cancelling, please retry".to_string())
        })?;

        tracing::info!(booking_id, "Booking cancelled");

        Ok(cancelled)
    }

    /// Pulls the payment intent from the gateway and applies its status with
    /// the same rules as webhook delivery. Used when a webhook was missed.
    pub async fn sync_payment_intent(&self, booking_id: i64) -> Result<SyncResult> {
        let booking = self.find_booking(booking_id).await?;

        let payment_intent_id = booking.payment_intent_id.clone().ok_or_else(|| {
            AppError::InvalidState("Booking has no payment intent to sync".to_string())
        })?;

        let intent = self.gateway.get_payment_intent(&payment_intent_id).await?;

        let Some(outcome) = PaymentOutcome::from_intent_status(&intent.status) else {
            tracing::debug!(booking_id, status = %intent.status, "Payment intent has no outcome yet");
            return Ok(SyncResult { booking, gateway_status: intent.status, changed: false });
        };

        match apply_outcome(self.booking_repo.as_ref(), &booking, outcome).await? {
            Some(updated) => {
                tracing::info!(
                    booking_id,
                    payment_intent_id = %payment_intent_id,
                    status = %intent.status,
                    "Booking reconciled with gateway"
                );
                Ok(SyncResult { booking: updated, gateway_status: intent.status, changed: true })
            }
            None => Ok(SyncResult { booking, gateway_status: intent.status, changed: false }),
        }
    }

    async fn find_booking(&self, booking_id: i64) -> Result<Booking> {
        self.booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
    }
}

fn validate(request: &CreateBookingRequest) -> Result<()> {
    if request.guest_name.trim().is_empty() {
        return Err(AppError::Validation("Guest name is required".to_string()));
    }
    if !request.guest_email.contains('@') {
        return Err(AppError::Validation("Guest email is invalid".to_string()));
    }
    if request.total_amount <= Decimal::ZERO {
        return Err(AppError::Validation("Total amount must be greater than 0".to_string()));
    }
    if request.check_out_date <= request.check_in_date {
        return Err(AppError::Validation(
            "Check-out date must be after check-in date".to_string(),
        ));
    }
    Ok(())
}
