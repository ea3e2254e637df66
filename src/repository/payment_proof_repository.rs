use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{PaymentProof, ProofReview, ProofStatus, SubmitProofRequest},
    error::{AppError, Result},
    repository::PaymentProofRepository,
};

#[derive(FromRow)]
struct PaymentProofRow {
    id: i64,
    booking_id: i64,
    status: String,
    payment_method: String,
    reference_number: Option<String>,
    verified_at: Option<NaiveDateTime>,
    verified_by: Option<String>,
    admin_notes: Option<String>,
    created_at: NaiveDateTime,
}

pub struct SqlitePaymentProofRepository {
    pool: SqlitePool,
}

impl SqlitePaymentProofRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_proof(row: PaymentProofRow) -> Result<PaymentProof> {
        Ok(PaymentProof {
            id: row.id,
            booking_id: row.booking_id,
            status: ProofStatus::from_str(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid proof status: {}", row.status)))?,
            payment_method: row.payment_method,
            reference_number: row.reference_number,
            verified_at: row.verified_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            verified_by: row.verified_by,
            admin_notes: row.admin_notes,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl PaymentProofRepository for SqlitePaymentProofRepository {
    async fn create(&self, booking_id: i64, proof: SubmitProofRequest) -> Result<PaymentProof> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO payment_proofs (
                booking_id, status, payment_method, reference_number, created_at
            ) VALUES (?, ?, ?, ?, ?)
            "#
        )
        .bind(booking_id)
        .bind(ProofStatus::Pending.as_str())
        .bind(&proof.payment_method)
        .bind(&proof.reference_number)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(result.last_insert_rowid()).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created payment proof".to_string())
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PaymentProof>> {
        let row = sqlx::query_as::<_, PaymentProofRow>(
            r#"
            SELECT id, booking_id, status, payment_method, reference_number,
                   verified_at, verified_by, admin_notes, created_at
            FROM payment_proofs
            WHERE id = ?
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_proof).transpose()
    }

    async fn find_latest_for_booking(&self, booking_id: i64) -> Result<Option<PaymentProof>> {
        // id breaks ties between uploads landing in the same instant
        let row = sqlx::query_as::<_, PaymentProofRow>(
            r#"
            SELECT id, booking_id, status, payment_method, reference_number,
                   verified_at, verified_by, admin_notes, created_at
            FROM payment_proofs
            WHERE booking_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_proof).transpose()
    }

    async fn review(&self, id: i64, review: ProofReview) -> Result<PaymentProof> {
        sqlx::query(
            r#"
            UPDATE payment_proofs
            SET status = ?,
                verified_at = ?,
                verified_by = ?,
                admin_notes = COALESCE(?, admin_notes)
            WHERE id = ?
            "#
        )
        .bind(review.status.as_str())
        .bind(review.reviewed_at.naive_utc())
        .bind(&review.reviewed_by)
        .bind(&review.admin_notes)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::NotFound("Payment proof not found".to_string())
        })
    }
}
