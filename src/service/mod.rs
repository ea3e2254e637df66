pub mod booking_service;
pub mod payment_proof_service;
pub mod refund_service;
pub mod webhook_service;

use std::sync::Arc;
use sqlx::SqlitePool;
use crate::domain::RefundPolicy;
use crate::payments::PaymentGateway;
use crate::repository::*;
use booking_service::BookingService;
use payment_proof_service::PaymentProofService;
use refund_service::RefundService;
use webhook_service::WebhookService;

pub use booking_service::{BookingView, SyncResult};
pub use refund_service::{RefundCommand, RefundOutcome, RefundQuote, RefundReceipt};
pub use webhook_service::WebhookOutcome;

pub struct ServiceContext {
    pub booking_repo: Arc<dyn BookingRepository>,
    pub proof_repo: Arc<dyn PaymentProofRepository>,
    pub booking_service: Arc<BookingService>,
    pub payment_proof_service: Arc<PaymentProofService>,
    pub refund_service: Arc<RefundService>,
    pub webhook_service: Arc<WebhookService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        booking_repo: Arc<dyn BookingRepository>,
        proof_repo: Arc<dyn PaymentProofRepository>,
        event_repo: Arc<dyn WebhookEventRepository>,
        gateway: Arc<dyn PaymentGateway>,
        refund_policy: RefundPolicy,
        webhook_secret: Option<String>,
        db_pool: SqlitePool,
    ) -> Self {
        let booking_service = Arc::new(BookingService::new(
            booking_repo.clone(),
            proof_repo.clone(),
            gateway.clone(),
        ));
        let payment_proof_service = Arc::new(PaymentProofService::new(
            booking_repo.clone(),
            proof_repo.clone(),
        ));
        let refund_service = Arc::new(RefundService::new(
            booking_repo.clone(),
            gateway,
            refund_policy,
        ));
        let webhook_service = Arc::new(WebhookService::new(
            booking_repo.clone(),
            event_repo,
            webhook_secret,
        ));

        Self {
            booking_repo,
            proof_repo,
            booking_service,
            payment_proof_service,
            refund_service,
            webhook_service,
            db_pool,
        }
    }

    /// Wires the SQLite repositories over `db_pool`.
    pub fn sqlite(
        db_pool: SqlitePool,
        gateway: Arc<dyn PaymentGateway>,
        refund_policy: RefundPolicy,
        webhook_secret: Option<String>,
    ) -> Self {
        Self::new(
            Arc::new(SqliteBookingRepository::new(db_pool.clone())),
            Arc::new(SqlitePaymentProofRepository::new(db_pool.clone())),
            Arc::new(SqliteWebhookEventRepository::new(db_pool.clone())),
            gateway,
            refund_policy,
            webhook_secret,
            db_pool,
        )
    }
}
