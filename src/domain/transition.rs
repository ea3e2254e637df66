//! Payment state transitions driven by gateway signals.
//!
//! Gateway notifications arrive at least once and in no guaranteed order, so
//! a transition is planned against the booking's current state: re-applying
//! an outcome that already holds plans nothing, and settled money (paid or
//! refunded) is never moved backwards by a late failure or processing signal.

use serde::{Deserialize, Serialize};

use super::{Booking, BookingStatus, PaymentStateUpdate, PaymentStatus};

/// What a gateway signal says happened to a booking's payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Paid,
    Processing,
    Failed,
    Cancelled,
}

impl PaymentOutcome {
    /// Maps a payment intent status reported by the gateway. Statuses that
    /// carry no settled outcome (e.g. `awaiting_payment_method`) map to `None`.
    pub fn from_intent_status(status: &str) -> Option<Self> {
        match status {
            "succeeded" => Some(PaymentOutcome::Paid),
            "processing" | "awaiting_next_action" => Some(PaymentOutcome::Processing),
            _ => None,
        }
    }
}

/// The update that moves `booking` to reflect `outcome`, or `None` when
/// nothing should be written.
pub fn plan_transition(booking: &Booking, outcome: PaymentOutcome) -> Option<PaymentStateUpdate> {
    let payment = booking.payment_status;
    let status = booking.status;

    if payment == Some(PaymentStatus::Refunded) {
        return None;
    }

    let update = match outcome {
        PaymentOutcome::Paid => PaymentStateUpdate {
            payment_status: Some(PaymentStatus::Paid),
            status: match status {
                // money that lands after a cancellation is recorded but the
                // booking stays cancelled so an admin can refund it
                Some(BookingStatus::Cancelled) | Some(BookingStatus::Completed) => None,
                Some(BookingStatus::Confirmed) => None,
                Some(BookingStatus::Pending) | Some(BookingStatus::PaymentFailed) | None => {
                    Some(BookingStatus::Confirmed)
                }
            },
        },
        PaymentOutcome::Processing => {
            if payment.is_some_and(|p| p.is_settled()) {
                return None;
            }
            PaymentStateUpdate {
                payment_status: Some(PaymentStatus::Processing),
                status: None,
            }
        }
        PaymentOutcome::Failed => {
            if payment.is_some_and(|p| p.is_settled()) {
                return None;
            }
            PaymentStateUpdate {
                payment_status: Some(PaymentStatus::Failed),
                status: match status {
                    Some(BookingStatus::Cancelled) | Some(BookingStatus::PaymentFailed) => None,
                    _ => Some(BookingStatus::PaymentFailed),
                },
            }
        }
        PaymentOutcome::Cancelled => {
            if payment.is_some_and(|p| p.is_settled()) {
                return None;
            }
            PaymentStateUpdate {
                payment_status: Some(PaymentStatus::Failed),
                status: match status {
                    Some(BookingStatus::Cancelled) => None,
                    _ => Some(BookingStatus::Cancelled),
                },
            }
        }
    };

    let payment_unchanged = update.payment_status.is_none() || update.payment_status == payment;
    let status_unchanged = update.status.is_none() || update.status == status;
    if payment_unchanged && status_unchanged {
        return None;
    }

    Some(update)
}
