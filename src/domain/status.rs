//! Canonical payment status shown to guests and admins.
//!
//! A booking carries up to three disagreeing payment signals: the latest
//! manually reviewed proof of payment, the status pushed by the gateway, and
//! the reservation lifecycle flag. They are consulted in that order and the
//! first one present decides. A human-reviewed proof outranks gateway
//! callbacks, and both outrank the lifecycle flag, which can lag behind the
//! actual payment event.
//!
//! The result is for display only and is never written back to the booking.

use serde::{Deserialize, Serialize};

use super::{BookingStatus, PaymentProof, PaymentStatus, ProofStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Paid,
    Pending,
    Cancelled,
}

impl DisplayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayStatus::Paid => "paid",
            DisplayStatus::Pending => "pending",
            DisplayStatus::Cancelled => "cancelled",
        }
    }
}

pub fn resolve_status(
    payment_status: Option<PaymentStatus>,
    booking_status: Option<BookingStatus>,
    proof: Option<&PaymentProof>,
) -> DisplayStatus {
    if let Some(proof) = proof {
        return from_proof(proof.status);
    }

    if let Some(payment_status) = payment_status {
        return from_payment(payment_status);
    }

    match booking_status {
        Some(status) => from_lifecycle(status),
        None => DisplayStatus::Pending,
    }
}

fn from_proof(status: ProofStatus) -> DisplayStatus {
    match status {
        ProofStatus::Verified => DisplayStatus::Paid,
        ProofStatus::Pending => DisplayStatus::Pending,
        ProofStatus::Rejected => DisplayStatus::Cancelled,
    }
}

fn from_payment(status: PaymentStatus) -> DisplayStatus {
    match status {
        PaymentStatus::Paid => DisplayStatus::Paid,
        PaymentStatus::Processing | PaymentStatus::Pending | PaymentStatus::PaymentReview => {
            DisplayStatus::Pending
        }
        PaymentStatus::Failed | PaymentStatus::Refunded => DisplayStatus::Cancelled,
    }
}

fn from_lifecycle(status: BookingStatus) -> DisplayStatus {
    match status {
        BookingStatus::Confirmed | BookingStatus::Completed => DisplayStatus::Paid,
        BookingStatus::Cancelled | BookingStatus::PaymentFailed => DisplayStatus::Cancelled,
        BookingStatus::Pending => DisplayStatus::Pending,
    }
}
