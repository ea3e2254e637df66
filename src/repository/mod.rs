use async_trait::async_trait;
use crate::domain::*;
use crate::error::Result;

pub mod booking_repository;
pub mod payment_proof_repository;
pub mod webhook_event_repository;

pub use booking_repository::SqliteBookingRepository;
pub use payment_proof_repository::SqlitePaymentProofRepository;
pub use webhook_event_repository::SqliteWebhookEventRepository;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, booking: CreateBookingRequest) -> Result<Booking>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>>;
    async fn find_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Booking>>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Booking>>;

    /// Applies `update` only while the stored payment status still equals
    /// `expected`. Returns `None` when the precondition no longer holds.
    async fn update_payment_state(
        &self,
        id: i64,
        expected: Option<PaymentStatus>,
        update: PaymentStateUpdate,
    ) -> Result<Option<Booking>>;

    /// Marks a paid booking with no recorded refund as being refunded.
    /// Returns `false` if the booking is not in that state anymore.
    async fn claim_for_refund(&self, id: i64) -> Result<bool>;
    async fn release_refund_claim(&self, id: i64) -> Result<()>;

    /// Writes the refund and moves the booking to cancelled/refunded in one
    /// update. Requires a paid booking holding the refund claim.
    async fn complete_refund(&self, id: i64, record: RefundRecord) -> Result<Option<Booking>>;

    /// Cancels a booking that has not been paid. The payment status keeps its
    /// pre-cancellation value. Returns `None` if the booking has been paid or
    /// a refund is under way.
    async fn cancel(&self, id: i64) -> Result<Option<Booking>>;
}

#[async_trait]
pub trait PaymentProofRepository: Send + Sync {
    async fn create(&self, booking_id: i64, proof: SubmitProofRequest) -> Result<PaymentProof>;
    async fn find_by_id(&self, id: i64) -> Result<Option<PaymentProof>>;
    /// The most recently submitted proof, the only authoritative one.
    async fn find_latest_for_booking(&self, booking_id: i64) -> Result<Option<PaymentProof>>;
    async fn review(&self, id: i64, review: ProofReview) -> Result<PaymentProof>;
}

#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    async fn is_processed(&self, event_id: &str) -> Result<bool>;
    async fn record(&self, event_id: &str, event_type: &str, booking_id: Option<i64>) -> Result<()>;
}
