#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use lagoon::{
    domain::*,
    error::{AppError, Result},
    payments::{GatewayPaymentIntent, GatewayRefund, GatewayRefundRequest, PaymentGateway},
    repository::{BookingRepository, SqliteBookingRepository},
};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

/// In-memory database with the crate migrations applied. A single
/// connection keeps every query on the same in-memory database.
pub async fn test_pool() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    Ok(pool)
}

pub fn booking_request(total: i64, check_in_in_days: i64) -> CreateBookingRequest {
    let check_in = (Utc::now() + Duration::days(check_in_in_days)).date_naive();
    CreateBookingRequest {
        guest_name: "Maria Santos".to_string(),
        guest_email: "maria@example.com".to_string(),
        total_amount: Decimal::from(total),
        check_in_date: check_in,
        check_out_date: check_in + Duration::days(2),
        payment_intent_id: Some(format!("pi_test_{}_{}", total, check_in_in_days)),
    }
}

/// Creates a booking and marks it paid and confirmed.
pub async fn paid_booking(
    repo: &dyn BookingRepository,
    total: i64,
    check_in_in_days: i64,
) -> anyhow::Result<Booking> {
    let booking = repo.create(booking_request(total, check_in_in_days)).await?;
    let booking = repo
        .update_payment_state(booking.id, Some(PaymentStatus::Pending), PaymentStateUpdate {
            payment_status: Some(PaymentStatus::Paid),
            status: Some(BookingStatus::Confirmed),
        })
        .await?
        .ok_or_else(|| anyhow::anyhow!("booking was not marked paid"))?;
    Ok(booking)
}

/// Records calls and answers with canned results.
pub struct FakeGateway {
    pub refunds: Mutex<Vec<GatewayRefundRequest>>,
    pub intent_lookups: Mutex<Vec<String>>,
    pub fail_refunds: bool,
    pub intent_status: String,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            refunds: Mutex::new(Vec::new()),
            intent_lookups: Mutex::new(Vec::new()),
            fail_refunds: false,
            intent_status: "succeeded".to_string(),
        }
    }

    pub fn failing() -> Self {
        Self { fail_refunds: true, ..Self::new() }
    }

    pub fn with_intent_status(status: &str) -> Self {
        Self { intent_status: status.to_string(), ..Self::new() }
    }

    pub fn refund_requests(&self) -> Vec<GatewayRefundRequest> {
        self.refunds.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_refund(&self, request: &GatewayRefundRequest) -> Result<GatewayRefund> {
        if self.fail_refunds {
            return Err(AppError::Gateway("refund rejected with status 400".to_string()));
        }

        let mut refunds = self.refunds.lock().unwrap();
        refunds.push(request.clone());

        Ok(GatewayRefund {
            id: format!("ref_{}", refunds.len()),
            status: RefundStatus::Pending,
        })
    }

    async fn get_payment_intent(&self, payment_intent_id: &str) -> Result<GatewayPaymentIntent> {
        self.intent_lookups.lock().unwrap().push(payment_intent_id.to_string());

        Ok(GatewayPaymentIntent {
            id: payment_intent_id.to_string(),
            status: self.intent_status.clone(),
            amount: 1_000_000,
        })
    }
}

/// SQLite repository whose final refund write always fails, as if the
/// database went away between the gateway call and the update.
pub struct FailingCompleteRepo {
    pub inner: SqliteBookingRepository,
}

impl FailingCompleteRepo {
    pub fn new(pool: SqlitePool) -> Arc<Self> {
        Arc::new(Self { inner: SqliteBookingRepository::new(pool) })
    }
}

#[async_trait]
impl BookingRepository for FailingCompleteRepo {
    async fn create(&self, booking: CreateBookingRequest) -> Result<Booking> {
        self.inner.create(booking).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Booking>> {
        self.inner.find_by_payment_intent(payment_intent_id).await
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Booking>> {
        self.inner.list(limit, offset).await
    }

    async fn update_payment_state(
        &self,
        id: i64,
        expected: Option<PaymentStatus>,
        update: PaymentStateUpdate,
    ) -> Result<Option<Booking>> {
        self.inner.update_payment_state(id, expected, update).await
    }

    async fn claim_for_refund(&self, id: i64) -> Result<bool> {
        self.inner.claim_for_refund(id).await
    }

    async fn release_refund_claim(&self, id: i64) -> Result<()> {
        self.inner.release_refund_claim(id).await
    }

    async fn complete_refund(&self, _id: i64, _record: RefundRecord) -> Result<Option<Booking>> {
        Err(AppError::Database("database is locked".to_string()))
    }

    async fn cancel(&self, id: i64) -> Result<Option<Booking>> {
        self.inner.cancel(id).await
    }
}

/// SQLite repository that loses one race: the first payment update moving a
/// booking to `conflict_on` finds the booking changed and writes nothing.
pub struct ConflictOnceRepo {
    pub inner: SqliteBookingRepository,
    conflict_on: Mutex<Option<PaymentStatus>>,
}

impl ConflictOnceRepo {
    pub fn new(pool: SqlitePool, conflict_on: PaymentStatus) -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteBookingRepository::new(pool),
            conflict_on: Mutex::new(Some(conflict_on)),
        })
    }
}

#[async_trait]
impl BookingRepository for ConflictOnceRepo {
    async fn create(&self, booking: CreateBookingRequest) -> Result<Booking> {
        self.inner.create(booking).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Booking>> {
        self.inner.find_by_payment_intent(payment_intent_id).await
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Booking>> {
        self.inner.list(limit, offset).await
    }

    async fn update_payment_state(
        &self,
        id: i64,
        expected: Option<PaymentStatus>,
        update: PaymentStateUpdate,
    ) -> Result<Option<Booking>> {
        {
            let mut conflict_on = self.conflict_on.lock().unwrap();
            if conflict_on.is_some() && *conflict_on == update.payment_status {
                *conflict_on = None;
                return Ok(None);
            }
        }
        self.inner.update_payment_state(id, expected, update).await
    }

    async fn claim_for_refund(&self, id: i64) -> Result<bool> {
        self.inner.claim_for_refund(id).await
    }

    async fn release_refund_claim(&self, id: i64) -> Result<()> {
        self.inner.release_refund_claim(id).await
    }

    async fn complete_refund(&self, id: i64, record: RefundRecord) -> Result<Option<Booking>> {
        self.inner.complete_refund(id, record).await
    }

    async fn cancel(&self, id: i64) -> Result<Option<Booking>> {
        self.inner.cancel(id).await
    }
}
