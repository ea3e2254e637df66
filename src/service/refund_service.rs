use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    domain::{
        to_minor_units, Booking, RefundOverride, RefundPolicy, RefundRecord, RefundStatus,
        RefundType,
    },
    error::{AppError, Result},
    payments::{GatewayRefundRequest, PaymentGateway},
    repository::BookingRepository,
};

const DEFAULT_REASON: &str = "requested_by_customer";

#[derive(Debug, Clone, Default)]
pub struct RefundCommand {
    pub refund_type: Option<RefundType>,
    pub refund_amount: Option<Decimal>,
    pub reason: Option<String>,
    pub processed_by: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RefundReceipt {
    pub booking_id: i64,
    /// `None` when the gateway accepted the refund but its reply was unreadable.
    pub refund_id: Option<String>,
    pub amount: Decimal,
    pub status: RefundStatus,
}

#[derive(Debug, Clone)]
pub enum RefundOutcome {
    /// Refunded at the gateway and recorded on the booking.
    Completed(RefundReceipt),
    /// Refunded at the gateway (or possibly refunded, when the gateway's reply
    /// could not be read) but the booking was not updated. The refund claim is
    /// kept so the refund cannot be retried; the booking needs manual
    /// reconciliation.
    PartialFailure { receipt: RefundReceipt, message: String },
}

impl RefundOutcome {
    pub fn receipt(&self) -> &RefundReceipt {
        match self {
            RefundOutcome::Completed(receipt) => receipt,
            RefundOutcome::PartialFailure { receipt, .. } => receipt,
        }
    }
}

/// Side-effect free preview of what cancelling now would refund.
#[derive(Debug, Clone, Serialize)]
pub struct RefundQuote {
    pub booking_id: i64,
    pub total_amount: Decimal,
    pub down_payment: Decimal,
    pub refund_amount: Decimal,
    pub hours_until_check_in: i64,
    pub eligible: bool,
}

pub struct RefundService {
    booking_repo: Arc<dyn BookingRepository>,
    gateway: Arc<dyn PaymentGateway>,
    policy: RefundPolicy,
}

impl RefundService {
    pub fn new(
        booking_repo: Arc<dyn BookingRepository>,
        gateway: Arc<dyn PaymentGateway>,
        policy: RefundPolicy,
    ) -> Self {
        Self { booking_repo, gateway, policy }
    }

    pub async fn quote(&self, booking_id: i64, now: DateTime<Utc>) -> Result<RefundQuote> {
        let booking = self.find_booking(booking_id).await?;
        let refund_amount = self
            .policy
            .calculate(booking.total_amount, booking.check_in_at(), now, None);

        Ok(RefundQuote {
            booking_id,
            total_amount: booking.total_amount,
            down_payment: self.policy.down_payment(booking.total_amount),
            refund_amount,
            hours_until_check_in: (booking.check_in_at() - now).num_hours(),
            eligible: booking.is_paid() && refund_amount > Decimal::ZERO,
        })
    }

    pub async fn process_refund(
        &self,
        booking_id: i64,
        command: RefundCommand,
        now: DateTime<Utc>,
    ) -> Result<RefundOutcome> {
        let booking = self.find_booking(booking_id).await?;

        let payment_intent_id = match (&booking.payment_intent_id, booking.is_paid()) {
            (Some(id), true) => id.clone(),
            _ => {
                return Err(AppError::InvalidState(
                    "Booking has no completed payment to refund".to_string(),
                ))
            }
        };

        let amount = self.refund_amount(&booking, &command, now)?;
        let minor_units = to_minor_units(amount)
            .ok_or_else(|| AppError::BadRequest("Refund amount is out of range".to_string()))?;

        if !self.booking_repo.claim_for_refund(booking_id).await? {
            return Err(AppError::Conflict(
                "A refund is already in progress for this booking".to_string(),
            ));
        }

        let reason = command
            .reason
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REASON.to_string());

        let mut metadata = HashMap::new();
        metadata.insert("booking_id".to_string(), booking_id.to_string());
        metadata.insert("processed_by".to_string(), command.processed_by.clone());
        if let Some(refund_type) = command.refund_type {
            metadata.insert("refund_type".to_string(), refund_type.as_str().to_string());
        }

        let request = GatewayRefundRequest {
            payment_intent_id,
            amount: minor_units,
            reason: reason.clone(),
            metadata,
        };

        let refund = match self.gateway.create_refund(&request).await {
            Ok(refund) => refund,
            Err(AppError::GatewayUnconfirmed(detail)) => {
                // the claim stays in place, the refund may already have gone out
                tracing::error!(
                    booking_id,
                    amount = %amount,
                    error = %detail,
                    "Gateway accepted refund with an unreadable reply, manual reconciliation required"
                );
                return Ok(RefundOutcome::PartialFailure {
                    receipt: RefundReceipt {
                        booking_id,
                        refund_id: None,
                        amount,
                        status: RefundStatus::Processing,
                    },
                    message: "The gateway accepted the refund but its reply could not be read. \
                              Do not retry; confirm the refund with the gateway and reconcile \
                              this booking manually."
                        .to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(booking_id, error = %e, "Gateway refused refund");
                if let Err(release_err) = self.booking_repo.release_refund_claim(booking_id).await {
                    tracing::error!(
                        booking_id,
                        error = %release_err,
                        "Failed to release refund claim after gateway error"
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            booking_id,
            refund_id = %refund.id,
            amount = %amount,
            "Refund issued at gateway"
        );

        let receipt = RefundReceipt {
            booking_id,
            refund_id: Some(refund.id.clone()),
            amount,
            status: refund.status,
        };

        let record = RefundRecord {
            refund_id: refund.id,
            refund_amount: amount,
            refund_status: refund.status,
            refund_reason: reason,
            refund_processed_by: command.processed_by,
            refund_processed_at: now,
        };

        let failure = match self.booking_repo.complete_refund(booking_id, record).await {
            Ok(Some(_)) => return Ok(RefundOutcome::Completed(receipt)),
            Ok(None) => "booking changed while the refund was being issued".to_string(),
            Err(e) => e.to_string(),
        };

        tracing::error!(
            booking_id,
            refund_id = ?receipt.refund_id,
            amount = %receipt.amount,
            error = %failure,
            "Refund issued but booking was not updated, manual reconciliation required"
        );

        Ok(RefundOutcome::PartialFailure {
            receipt,
            message: "Refund was issued but the booking could not be updated. \
                      Do not retry; reconcile this booking manually."
                .to_string(),
        })
    }

    fn refund_amount(
        &self,
        booking: &Booking,
        command: &RefundCommand,
        now: DateTime<Utc>,
    ) -> Result<Decimal> {
        let refund_override = RefundOverride::from_request(command.refund_type, command.refund_amount);

        if let Some(RefundOverride::Partial(amount)) = refund_override {
            if amount <= Decimal::ZERO || amount > booking.total_amount {
                return Err(AppError::BadRequest(format!(
                    "Refund amount must be greater than 0 and at most {}",
                    booking.total_amount
                )));
            }
        }

        let amount = self
            .policy
            .calculate(booking.total_amount, booking.check_in_at(), now, refund_override);

        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidState(
                "Cancellations this close to check-in are not refundable online, \
                 please contact the resort"
                    .to_string(),
            ));
        }

        Ok(amount)
    }

    async fn find_booking(&self, booking_id: i64) -> Result<Booking> {
        self.booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
    }
}
