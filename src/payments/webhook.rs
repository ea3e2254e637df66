//! Gateway webhook payloads.
//!
//! ```text
//! { "data": { "id": "evt_...",
//!             "attributes": { "type": "payment.paid",
//!                             "data": { "id": "pay_...", "type": "payment",
//!                                       "attributes": { "payment_intent_id": "pi_...",
//!                                                       "metadata": { "booking_id": "42" } } } } } }
//! ```

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{
    domain::PaymentOutcome,
    error::{AppError, Result},
};

pub const SIGNATURE_HEADER: &str = "paymongo-signature";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    PaymentPaid,
    PaymentFailed,
    PaymentIntentSucceeded,
    PaymentIntentPaymentFailed,
    PaymentIntentProcessing,
    PaymentIntentCancelled,
    SourceChargeable,
    SourceExpired,
    SourceFailed,
    SourceCancelled,
    Unknown(String),
}

impl WebhookEventType {
    pub fn parse(s: &str) -> Self {
        match s {
            "payment.paid" => WebhookEventType::PaymentPaid,
            "payment.failed" => WebhookEventType::PaymentFailed,
            "payment_intent.succeeded" => WebhookEventType::PaymentIntentSucceeded,
            "payment_intent.payment_failed" => WebhookEventType::PaymentIntentPaymentFailed,
            "payment_intent.processing" => WebhookEventType::PaymentIntentProcessing,
            "payment_intent.cancelled" => WebhookEventType::PaymentIntentCancelled,
            "source.chargeable" => WebhookEventType::SourceChargeable,
            "source.expired" => WebhookEventType::SourceExpired,
            "source.failed" => WebhookEventType::SourceFailed,
            "source.cancelled" => WebhookEventType::SourceCancelled,
            other => WebhookEventType::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WebhookEventType::PaymentPaid => "payment.paid",
            WebhookEventType::PaymentFailed => "payment.failed",
            WebhookEventType::PaymentIntentSucceeded => "payment_intent.succeeded",
            WebhookEventType::PaymentIntentPaymentFailed => "payment_intent.payment_failed",
            WebhookEventType::PaymentIntentProcessing => "payment_intent.processing",
            WebhookEventType::PaymentIntentCancelled => "payment_intent.cancelled",
            WebhookEventType::SourceChargeable => "source.chargeable",
            WebhookEventType::SourceExpired => "source.expired",
            WebhookEventType::SourceFailed => "source.failed",
            WebhookEventType::SourceCancelled => "source.cancelled",
            WebhookEventType::Unknown(other) => other,
        }
    }

    /// The payment outcome an event reports, `None` for unrecognized types.
    pub fn outcome(&self) -> Option<PaymentOutcome> {
        match self {
            WebhookEventType::PaymentPaid | WebhookEventType::PaymentIntentSucceeded => {
                Some(PaymentOutcome::Paid)
            }
            WebhookEventType::PaymentIntentProcessing | WebhookEventType::SourceChargeable => {
                Some(PaymentOutcome::Processing)
            }
            WebhookEventType::PaymentFailed
            | WebhookEventType::PaymentIntentPaymentFailed
            | WebhookEventType::SourceFailed
            | WebhookEventType::SourceExpired => Some(PaymentOutcome::Failed),
            WebhookEventType::PaymentIntentCancelled | WebhookEventType::SourceCancelled => {
                Some(PaymentOutcome::Cancelled)
            }
            WebhookEventType::Unknown(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub id: String,
    pub event_type: WebhookEventType,
    /// Id of the payment, payment intent or source the event is about.
    pub resource_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub booking_id: Option<i64>,
}

impl WebhookEvent {
    /// Gateway references a booking may be stored under, most specific first.
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = Vec::new();
        for r in [self.payment_intent_id.as_deref(), self.resource_id.as_deref()]
            .into_iter()
            .flatten()
        {
            if !refs.contains(&r) {
                refs.push(r);
            }
        }
        refs
    }
}

#[derive(Deserialize)]
struct EventEnvelope {
    data: EventData,
}

#[derive(Deserialize)]
struct EventData {
    id: String,
    attributes: EventAttributes,
}

#[derive(Deserialize)]
struct EventAttributes {
    #[serde(rename = "type")]
    event_type: String,
    data: Option<ResourceData>,
}

#[derive(Deserialize)]
struct ResourceData {
    id: Option<String>,
    #[serde(rename = "type")]
    resource_type: Option<String>,
    #[serde(default)]
    attributes: Value,
}

pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent> {
    let envelope: EventEnvelope = serde_json::from_slice(payload)
        .map_err(|e| AppError::BadRequest(format!("Malformed webhook payload: {}", e)))?;

    let event_type = WebhookEventType::parse(&envelope.data.attributes.event_type);
    let resource = envelope.data.attributes.data;

    let (resource_id, payment_intent_id, booking_id) = match resource {
        Some(resource) => {
            let intent = resource
                .attributes
                .get("payment_intent_id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| match resource.resource_type.as_deref() {
                    Some("payment_intent") => resource.id.clone(),
                    _ => None,
                });
            let booking = resource
                .attributes
                .get("metadata")
                .and_then(|m| m.get("booking_id"))
                .and_then(booking_id_from);
            (resource.id, intent, booking)
        }
        None => (None, None, None),
    };

    Ok(WebhookEvent {
        id: envelope.data.id,
        event_type,
        resource_id,
        payment_intent_id,
        booking_id,
    })
}

fn booking_id_from(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Checks a `t=<timestamp>,te=<test sig>,li=<live sig>` signature header.
/// Either signature may match; each is hex HMAC-SHA256 of `<timestamp>.<body>`.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str) -> Result<()> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        if let Some((key, value)) = part.trim().split_once('=') {
            match key {
                "t" => timestamp = Some(value),
                "te" | "li" if !value.is_empty() => signatures.push(value),
                _ => {}
            }
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| AppError::BadRequest("Missing signature timestamp".to_string()))?;

    let expected = sign(payload, timestamp, secret)?;

    let valid = signatures
        .iter()
        .any(|sig| bool::from(expected.as_bytes().ct_eq(sig.as_bytes())));

    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid signature".to_string()))
    }
}

pub fn sign(payload: &[u8], timestamp: &str, secret: &str) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid webhook secret: {}", e)))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
