use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::{domain::RefundStatus, error::Result};

pub mod gateway_client;
pub mod webhook;

pub use gateway_client::GatewayClient;

/// Refund request as sent to the gateway. `amount` is in minor units.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayRefundRequest {
    pub payment_intent_id: String,
    pub amount: i64,
    pub reason: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRefund {
    pub id: String,
    pub status: RefundStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayPaymentIntent {
    pub id: String,
    pub status: String,
    /// Minor units.
    pub amount: i64,
}

/// The third-party payment processor.
///
/// A rejection or transport failure, including a timeout, means the operation
/// did not happen at the gateway and is reported as `AppError::Gateway`. A
/// refund the gateway accepted with a reply that can't be read is reported as
/// `AppError::GatewayUnconfirmed`; the refund may have been issued.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_refund(&self, request: &GatewayRefundRequest) -> Result<GatewayRefund>;
    async fn get_payment_intent(&self, payment_intent_id: &str) -> Result<GatewayPaymentIntent>;
}
