use std::sync::Arc;

use serde::Serialize;

use crate::{
    domain::{plan_transition, Booking, PaymentOutcome},
    error::{AppError, Result},
    payments::webhook::{parse_event, verify_signature, WebhookEvent},
    repository::{BookingRepository, WebhookEventRepository},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// The booking's payment state was updated.
    Applied { booking_id: i64, outcome: PaymentOutcome },
    /// The booking already reflected the event.
    AlreadySettled { booking_id: i64 },
    /// This event id was processed before.
    Duplicate,
    /// No booking references the event's payment.
    BookingNotFound,
    /// Event type this service does not act on.
    Ignored,
}

/// Applies a gateway-reported outcome to a booking if it changes anything.
///
/// Returns `None` when the booking already reflects the outcome. The write is
/// conditional on the payment status that was read; if another writer got
/// there first the caller gets a `Conflict` and the gateway's redelivery will
/// re-evaluate against fresh state.
pub async fn apply_outcome(
    booking_repo: &dyn BookingRepository,
    booking: &Booking,
    outcome: PaymentOutcome,
) -> Result<Option<Booking>> {
    let Some(update) = plan_transition(booking, outcome) else {
        return Ok(None);
    };

    booking_repo
        .update_payment_state(booking.id, booking.payment_status, update)
        .await?
        .map(Some)
        .ok_or_else(|| {
            AppError::Conflict("Booking payment state changed concurrently, retry".to_string())
        })
}

pub struct WebhookService {
    booking_repo: Arc<dyn BookingRepository>,
    event_repo: Arc<dyn WebhookEventRepository>,
    webhook_secret: Option<String>,
}

impl WebhookService {
    pub fn new(
        booking_repo: Arc<dyn BookingRepository>,
        event_repo: Arc<dyn WebhookEventRepository>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self { booking_repo, event_repo, webhook_secret }
    }

    pub async fn handle(&self, payload: &[u8], signature: Option<&str>) -> Result<WebhookOutcome> {
        if let Some(secret) = &self.webhook_secret {
            let signature = signature
                .ok_or_else(|| AppError::BadRequest("Missing webhook signature".to_string()))?;
            verify_signature(payload, signature, secret)?;
        }

        let event = parse_event(payload)?;

        let Some(outcome) = event.event_type.outcome() else {
            tracing::info!(
                event_id = %event.id,
                "Ignoring unhandled webhook event type: {}",
                event.event_type.as_str()
            );
            return Ok(WebhookOutcome::Ignored);
        };

        if self.event_repo.is_processed(&event.id).await? {
            tracing::debug!(event_id = %event.id, "Duplicate webhook delivery");
            return Ok(WebhookOutcome::Duplicate);
        }

        let Some(booking) = self.find_booking(&event).await? else {
            tracing::warn!(
                event_id = %event.id,
                event_type = event.event_type.as_str(),
                references = ?event.references(),
                "No booking found for webhook event"
            );
            self.event_repo
                .record(&event.id, event.event_type.as_str(), None)
                .await?;
            return Ok(WebhookOutcome::BookingNotFound);
        };

        let result = match apply_outcome(self.booking_repo.as_ref(), &booking, outcome).await? {
            Some(updated) => {
                tracing::info!(
                    event_id = %event.id,
                    booking_id = updated.id,
                    payment_status = ?updated.payment_status,
                    status = ?updated.status,
                    "Applied {} to booking",
                    event.event_type.as_str()
                );
                WebhookOutcome::Applied { booking_id: booking.id, outcome }
            }
            None => {
                tracing::debug!(
                    event_id = %event.id,
                    booking_id = booking.id,
                    "Booking already reflects {}",
                    event.event_type.as_str()
                );
                WebhookOutcome::AlreadySettled { booking_id: booking.id }
            }
        };

        self.event_repo
            .record(&event.id, event.event_type.as_str(), Some(booking.id))
            .await?;

        Ok(result)
    }

    async fn find_booking(&self, event: &WebhookEvent) -> Result<Option<Booking>> {
        for reference in event.references() {
            if let Some(booking) = self.booking_repo.find_by_payment_intent(reference).await? {
                return Ok(Some(booking));
            }
        }

        match event.booking_id {
            Some(id) => self.booking_repo.find_by_id(id).await,
            None => Ok(None),
        }
    }
}
