use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub guest_name: String,
    pub guest_email: String,
    pub total_amount: Decimal,
    pub payment_status: Option<PaymentStatus>,
    pub status: Option<BookingStatus>,
    pub payment_intent_id: Option<String>,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub refund_id: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub refund_status: Option<RefundStatus>,
    pub refund_reason: Option<String>,
    pub refund_processed_by: Option<String>,
    pub refund_processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Check-in instant used by the refund policy: the check-in date at
    /// midnight UTC.
    pub fn check_in_at(&self) -> DateTime<Utc> {
        self.check_in_date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_default()
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == Some(PaymentStatus::Paid)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == Some(BookingStatus::Cancelled)
    }
}

/// Gateway-driven payment state of a booking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Paid,
    Failed,
    Refunded,
    PaymentReview,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::PaymentReview => "payment_review",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(PaymentStatus::Pending),
            "processing" => Some(PaymentStatus::Processing),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            "payment_review" => Some(PaymentStatus::PaymentReview),
            _ => None,
        }
    }

    /// Money has settled: either collected or already returned.
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Refunded)
    }
}

/// Reservation lifecycle state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    PaymentFailed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::PaymentFailed => "payment_failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "payment_failed" => Some(BookingStatus::PaymentFailed),
            _ => None,
        }
    }
}

/// State of the refund recorded on a booking.
///
/// `Processing` is the local claim taken before the gateway is called; the
/// other variants mirror the status reported by the gateway.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Processing,
    Pending,
    Succeeded,
    Failed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Processing => "processing",
            RefundStatus::Pending => "pending",
            RefundStatus::Succeeded => "succeeded",
            RefundStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "processing" => Some(RefundStatus::Processing),
            "pending" => Some(RefundStatus::Pending),
            "succeeded" => Some(RefundStatus::Succeeded),
            "failed" => Some(RefundStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub guest_name: String,
    pub guest_email: String,
    pub total_amount: Decimal,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub payment_intent_id: Option<String>,
}

/// Payment state transition applied by webhooks, proof review and gateway
/// sync. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentStateUpdate {
    pub payment_status: Option<PaymentStatus>,
    pub status: Option<BookingStatus>,
}

/// Fields written in the single update that finalizes a refund.
#[derive(Debug, Clone)]
pub struct RefundRecord {
    pub refund_id: String,
    pub refund_amount: Decimal,
    pub refund_status: RefundStatus,
    pub refund_reason: String,
    pub refund_processed_by: String,
    pub refund_processed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_strings() {
        assert_eq!(PaymentStatus::PaymentReview.as_str(), "payment_review");
        assert_eq!(PaymentStatus::from_str("PAID"), Some(PaymentStatus::Paid));
        assert_eq!(PaymentStatus::from_str("settled"), None);
    }

    #[test]
    fn test_booking_status_strings() {
        assert_eq!(BookingStatus::PaymentFailed.as_str(), "payment_failed");
        assert_eq!(BookingStatus::from_str("completed"), Some(BookingStatus::Completed));
        assert_eq!(BookingStatus::from_str("archived"), None);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&PaymentStatus::PaymentReview).unwrap();
        assert_eq!(json, "\"payment_review\"");
        let parsed: BookingStatus = serde_json::from_str("\"payment_failed\"").unwrap();
        assert_eq!(parsed, BookingStatus::PaymentFailed);
    }
}
