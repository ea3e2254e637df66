use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{
        Booking, BookingStatus, CreateBookingRequest, PaymentStateUpdate, PaymentStatus,
        RefundRecord, RefundStatus,
    },
    error::{AppError, Result},
    repository::BookingRepository,
};

const SELECT_BOOKING: &str = r#"
    SELECT id, guest_name, guest_email, total_amount, payment_status, status,
           payment_intent_id, check_in_date, check_out_date,
           refund_id, refund_amount, refund_status, refund_reason,
           refund_processed_by, refund_processed_at, created_at, updated_at
    FROM bookings
"#;

#[derive(FromRow)]
struct BookingRow {
    id: i64,
    guest_name: String,
    guest_email: String,
    total_amount: String,
    payment_status: Option<String>,
    status: Option<String>,
    payment_intent_id: Option<String>,
    check_in_date: NaiveDate,
    check_out_date: NaiveDate,
    refund_id: Option<String>,
    refund_amount: Option<String>,
    refund_status: Option<String>,
    refund_reason: Option<String>,
    refund_processed_by: Option<String>,
    refund_processed_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteBookingRepository {
    pool: SqlitePool,
}

impl SqliteBookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_booking(row: BookingRow) -> Result<Booking> {
        Ok(Booking {
            id: row.id,
            guest_name: row.guest_name,
            guest_email: row.guest_email,
            total_amount: Self::parse_amount(&row.total_amount)?,
            payment_status: row
                .payment_status
                .as_deref()
                .map(Self::parse_payment_status)
                .transpose()?,
            status: row.status.as_deref().map(Self::parse_booking_status).transpose()?,
            payment_intent_id: row.payment_intent_id,
            check_in_date: row.check_in_date,
            check_out_date: row.check_out_date,
            refund_id: row.refund_id,
            refund_amount: row.refund_amount.as_deref().map(Self::parse_amount).transpose()?,
            refund_status: row
                .refund_status
                .as_deref()
                .map(Self::parse_refund_status)
                .transpose()?,
            refund_reason: row.refund_reason,
            refund_processed_by: row.refund_processed_by,
            refund_processed_at: row
                .refund_processed_at
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_amount(s: &str) -> Result<Decimal> {
        Decimal::from_str(s).map_err(|e| AppError::Database(format!("Invalid amount {}: {}", s, e)))
    }

    fn parse_payment_status(s: &str) -> Result<PaymentStatus> {
        PaymentStatus::from_str(s)
            .ok_or_else(|| AppError::Database(format!("Invalid payment status: {}", s)))
    }

    fn parse_booking_status(s: &str) -> Result<BookingStatus> {
        BookingStatus::from_str(s)
            .ok_or_else(|| AppError::Database(format!("Invalid booking status: {}", s)))
    }

    fn parse_refund_status(s: &str) -> Result<RefundStatus> {
        RefundStatus::from_str(s)
            .ok_or_else(|| AppError::Database(format!("Invalid refund status: {}", s)))
    }

    async fn fetch_existing(&self, id: i64) -> Result<Booking> {
        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated booking".to_string())
        })
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn create(&self, booking: CreateBookingRequest) -> Result<Booking> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO bookings (
                guest_name, guest_email, total_amount, payment_status, status,
                payment_intent_id, check_in_date, check_out_date,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(&booking.guest_name)
        .bind(&booking.guest_email)
        .bind(booking.total_amount.to_string())
        .bind(PaymentStatus::Pending.as_str())
        .bind(BookingStatus::Pending.as_str())
        .bind(&booking.payment_intent_id)
        .bind(booking.check_in_date)
        .bind(booking.check_out_date)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(result.last_insert_rowid()).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created booking".to_string())
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("{} WHERE id = ?", SELECT_BOOKING))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn find_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "{} WHERE payment_intent_id = ? ORDER BY id DESC LIMIT 1",
            SELECT_BOOKING
        ))
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "{} ORDER BY check_in_date DESC, id DESC LIMIT ? OFFSET ?",
            SELECT_BOOKING
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_booking).collect()
    }

    async fn update_payment_state(
        &self,
        id: i64,
        expected: Option<PaymentStatus>,
        update: PaymentStateUpdate,
    ) -> Result<Option<Booking>> {
        let now = Utc::now().naive_utc();

        // `IS` compares NULL-safely, so an unset payment status can be expected too
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET payment_status = COALESCE(?, payment_status),
                status = COALESCE(?, status),
                updated_at = ?
            WHERE id = ? AND payment_status IS ?
            "#
        )
        .bind(update.payment_status.map(|s| s.as_str()))
        .bind(update.status.map(|s| s.as_str()))
        .bind(now)
        .bind(id)
        .bind(expected.map(|s| s.as_str()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch_existing(id).await.map(Some)
    }

    async fn claim_for_refund(&self, id: i64) -> Result<bool> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET refund_status = ?, updated_at = ?
            WHERE id = ? AND payment_status = ? AND refund_status IS NULL
            "#
        )
        .bind(RefundStatus::Processing.as_str())
        .bind(now)
        .bind(id)
        .bind(PaymentStatus::Paid.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_refund_claim(&self, id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET refund_status = NULL
            WHERE id = ? AND refund_status = ?
            "#
        )
        .bind(id)
        .bind(RefundStatus::Processing.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn complete_refund(&self, id: i64, record: RefundRecord) -> Result<Option<Booking>> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET payment_status = ?,
                status = ?,
                refund_id = ?,
                refund_amount = ?,
                refund_status = ?,
                refund_reason = ?,
                refund_processed_by = ?,
                refund_processed_at = ?,
                updated_at = ?
            WHERE id = ? AND payment_status = ? AND refund_status = ?
            "#
        )
        .bind(PaymentStatus::Refunded.as_str())
        .bind(BookingStatus::Cancelled.as_str())
        .bind(&record.refund_id)
        .bind(record.refund_amount.to_string())
        .bind(record.refund_status.as_str())
        .bind(&record.refund_reason)
        .bind(&record.refund_processed_by)
        .bind(record.refund_processed_at.naive_utc())
        .bind(now)
        .bind(id)
        .bind(PaymentStatus::Paid.as_str())
        .bind(RefundStatus::Processing.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch_existing(id).await.map(Some)
    }

    async fn cancel(&self, id: i64) -> Result<Option<Booking>> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = ?, updated_at = ?
            WHERE id = ?
              AND (payment_status IS NULL OR payment_status != ?)
              AND refund_status IS NULL
            "#
        )
        .bind(BookingStatus::Cancelled.as_str())
        .bind(now)
        .bind(id)
        .bind(PaymentStatus::Paid.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch_existing(id).await.map(Some)
    }
}
