use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{error::Result, repository::WebhookEventRepository};

pub struct SqliteWebhookEventRepository {
    pool: SqlitePool,
}

impl SqliteWebhookEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookEventRepository for SqliteWebhookEventRepository {
    async fn is_processed(&self, event_id: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT 1 FROM webhook_events WHERE event_id = ?
            "#
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn record(&self, event_id: &str, event_type: &str, booking_id: Option<i64>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO webhook_events (event_id, event_type, booking_id, received_at)
            VALUES (?, ?, ?, ?)
            "#
        )
        .bind(event_id)
        .bind(event_type)
        .bind(booking_id)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
