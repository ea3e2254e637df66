use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    domain::{
        Booking, PaymentOutcome, PaymentProof, PaymentStateUpdate, PaymentStatus, ProofReview,
        ProofStatus, SubmitProofRequest,
    },
    error::{AppError, Result},
    repository::{BookingRepository, PaymentProofRepository},
    service::webhook_service::apply_outcome,
};

pub struct PaymentProofService {
    booking_repo: Arc<dyn BookingRepository>,
    proof_repo: Arc<dyn PaymentProofRepository>,
}

impl PaymentProofService {
    pub fn new(
        booking_repo: Arc<dyn BookingRepository>,
        proof_repo: Arc<dyn PaymentProofRepository>,
    ) -> Self {
        Self { booking_repo, proof_repo }
    }

    /// Records a guest's proof of an out-of-band payment and puts the booking
    /// under payment review.
    pub async fn submit_proof(&self, booking_id: i64, request: SubmitProofRequest) -> Result<PaymentProof> {
        if request.payment_method.trim().is_empty() {
            return Err(AppError::Validation("Payment method is required".to_string()));
        }

        let booking = self.find_booking(booking_id).await?;

        if booking.is_cancelled() {
            return Err(AppError::InvalidState("Booking has been cancelled".to_string()));
        }
        if booking.payment_status.is_some_and(|p| p.is_settled()) {
            return Err(AppError::InvalidState("Booking is already paid".to_string()));
        }

        let proof = self.proof_repo.create(booking_id, request).await?;

        let update = PaymentStateUpdate {
            payment_status: Some(PaymentStatus::PaymentReview),
            status: None,
        };
        if booking.payment_status != Some(PaymentStatus::PaymentReview) {
            self.booking_repo
                .update_payment_state(booking_id, booking.payment_status, update)
                .await?
                .ok_or_else(|| {
                    AppError::Conflict("Booking payment state changed, please retry".to_string())
                })?;
        }

        tracing::info!(booking_id, proof_id = proof.id, "Payment proof submitted");

        Ok(proof)
    }

    /// Accepts a proof: the booking is paid and confirmed.
    ///
    /// The booking is updated before the proof is marked, and again on a
    /// repeated verification, so a retry after a failed write still leaves the
    /// booking paid.
    pub async fn verify_proof(
        &self,
        proof_id: i64,
        admin: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PaymentProof> {
        let (proof, booking) = self.reviewable(proof_id, ProofStatus::Verified).await?;

        apply_outcome(self.booking_repo.as_ref(), &booking, PaymentOutcome::Paid).await?;

        if proof.status == ProofStatus::Verified {
            return Ok(proof);
        }

        let proof = self
            .proof_repo
            .review(proof_id, ProofReview {
                status: ProofStatus::Verified,
                reviewed_by: admin.to_string(),
                reviewed_at: now,
                admin_notes: notes,
            })
            .await?;

        tracing::info!(booking_id = booking.id, proof_id, admin, "Payment proof verified");

        Ok(proof)
    }

    /// Rejects a proof. The booking's payment is marked failed but the
    /// reservation stays open so the guest can upload a new proof.
    pub async fn reject_proof(
        &self,
        proof_id: i64,
        admin: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PaymentProof> {
        let (proof, booking) = self.reviewable(proof_id, ProofStatus::Rejected).await?;

        // booking first, see verify_proof
        let needs_update = match booking.payment_status {
            Some(PaymentStatus::Failed) => false,
            Some(status) => !status.is_settled(),
            None => true,
        };
        if needs_update {
            let update = PaymentStateUpdate {
                payment_status: Some(PaymentStatus::Failed),
                status: None,
            };
            self.booking_repo
                .update_payment_state(booking.id, booking.payment_status, update)
                .await?
                .ok_or_else(|| {
                    AppError::Conflict("Booking payment state changed, please retry".to_string())
                })?;
        }

        if proof.status == ProofStatus::Rejected {
            return Ok(proof);
        }

        let proof = self
            .proof_repo
            .review(proof_id, ProofReview {
                status: ProofStatus::Rejected,
                reviewed_by: admin.to_string(),
                reviewed_at: now,
                admin_notes: notes,
            })
            .await?;

        tracing::info!(booking_id = booking.id, proof_id, admin, "Payment proof rejected");

        Ok(proof)
    }

    /// Loads a proof and its booking, allowing review only of the booking's
    /// latest proof and only from `pending` (or a repeat of the same decision).
    async fn reviewable(&self, proof_id: i64, decision: ProofStatus) -> Result<(PaymentProof, Booking)> {
        let proof = self
            .proof_repo
            .find_by_id(proof_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment proof not found".to_string()))?;

        let latest = self.proof_repo.find_latest_for_booking(proof.booking_id).await?;
        if latest.as_ref().map(|p| p.id) != Some(proof.id) {
            return Err(AppError::Conflict(
                "A newer payment proof has been submitted for this booking".to_string(),
            ));
        }

        if proof.status != ProofStatus::Pending && proof.status != decision {
            return Err(AppError::InvalidState(format!(
                "Payment proof has already been {}",
                proof.status.as_str()
            )));
        }

        let booking = self.find_booking(proof.booking_id).await?;

        Ok((proof, booking))
    }

    async fn find_booking(&self, booking_id: i64) -> Result<Booking> {
        self.booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
    }
}
