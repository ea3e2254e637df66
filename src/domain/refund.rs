//! Cancellation refund policy.
//!
//! Only the down payment is refundable under the standard policy. How much of
//! it comes back depends on how far ahead of check-in the cancellation lands:
//!
//! ```text
//!   until check-in     refund
//!   >= 48h             100% of down payment
//!   24h .. 48h          50% of down payment, rounded to a whole unit
//!   < 24h               nothing (guest contacts the resort)
//! ```
//!
//! Admins can bypass the policy with an explicit full or partial override.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RefundPolicy {
    /// Share of the total collected up front.
    pub down_payment_ratio: Decimal,
    /// Cancelling at least this many hours before check-in refunds the whole
    /// down payment.
    pub full_refund_hours: i64,
    /// Cancelling at least this many hours before check-in refunds
    /// `partial_refund_ratio` of the down payment.
    pub partial_refund_hours: i64,
    pub partial_refund_ratio: Decimal,
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self {
            down_payment_ratio: Decimal::new(5, 1),
            full_refund_hours: 48,
            partial_refund_hours: 24,
            partial_refund_ratio: Decimal::new(5, 1),
        }
    }
}

impl RefundPolicy {
    /// Down payment at most half the total, ratios within range and the
    /// partial window no longer than the full one.
    pub fn validate(&self) -> Result<(), String> {
        if self.down_payment_ratio < Decimal::ZERO || self.down_payment_ratio > Decimal::new(5, 1) {
            return Err(format!(
                "down_payment_ratio must be between 0 and 0.5, got {}",
                self.down_payment_ratio
            ));
        }
        if self.partial_refund_ratio < Decimal::ZERO || self.partial_refund_ratio > Decimal::ONE {
            return Err(format!(
                "partial_refund_ratio must be between 0 and 1, got {}",
                self.partial_refund_ratio
            ));
        }
        if self.partial_refund_hours < 0 {
            return Err("partial_refund_hours must not be negative".to_string());
        }
        if self.partial_refund_hours > self.full_refund_hours {
            return Err(format!(
                "partial_refund_hours ({}) must not exceed full_refund_hours ({})",
                self.partial_refund_hours, self.full_refund_hours
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundType {
    Full,
    Partial,
}

impl RefundType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundType::Full => "full",
            RefundType::Partial => "partial",
        }
    }
}

/// Admin override of the time-based policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefundOverride {
    /// Refund the whole stay, not just the down payment.
    Full,
    /// Refund exactly this amount.
    Partial(Decimal),
}

impl RefundOverride {
    /// A partial request without an amount falls back to the policy.
    pub fn from_request(refund_type: Option<RefundType>, amount: Option<Decimal>) -> Option<Self> {
        match (refund_type, amount) {
            (Some(RefundType::Full), _) => Some(RefundOverride::Full),
            (Some(RefundType::Partial), Some(amount)) => Some(RefundOverride::Partial(amount)),
            (Some(RefundType::Partial), None) | (None, _) => None,
        }
    }
}

impl RefundPolicy {
    pub fn down_payment(&self, total_amount: Decimal) -> Decimal {
        (total_amount * self.down_payment_ratio).normalize()
    }

    /// Refund owed for cancelling a stay worth `total_amount` at `now`.
    ///
    /// The result is never negative and never exceeds `total_amount`.
    pub fn calculate(
        &self,
        total_amount: Decimal,
        check_in: DateTime<Utc>,
        now: DateTime<Utc>,
        refund_override: Option<RefundOverride>,
    ) -> Decimal {
        let total_amount = total_amount.max(Decimal::ZERO);

        let refund = match refund_override {
            Some(RefundOverride::Full) => total_amount,
            Some(RefundOverride::Partial(amount)) => amount,
            None => self.policy_refund(total_amount, check_in - now),
        };

        refund.max(Decimal::ZERO).min(total_amount).normalize()
    }

    fn policy_refund(&self, total_amount: Decimal, until_check_in: Duration) -> Decimal {
        let down_payment = self.down_payment(total_amount);

        if until_check_in >= Duration::hours(self.full_refund_hours) {
            down_payment
        } else if until_check_in >= Duration::hours(self.partial_refund_hours) {
            (down_payment * self.partial_refund_ratio)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        } else {
            Decimal::ZERO
        }
    }
}

/// Refund under the default policy.
pub fn calculate_refund(
    total_amount: Decimal,
    check_in: DateTime<Utc>,
    now: DateTime<Utc>,
    refund_override: Option<RefundOverride>,
) -> Decimal {
    RefundPolicy::default().calculate(total_amount, check_in, now, refund_override)
}

/// Converts a major-unit amount to the gateway's integer minor units
/// (₱1,500.00 -> 150000).
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Inverse of [`to_minor_units`].
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}
