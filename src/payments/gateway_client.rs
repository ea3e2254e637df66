use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

use crate::{
    config::GatewayConfig,
    domain::RefundStatus,
    error::{AppError, Result},
    payments::{GatewayPaymentIntent, GatewayRefund, GatewayRefundRequest, PaymentGateway},
};

#[derive(Deserialize)]
struct Envelope<T> {
    data: Resource<T>,
}

#[derive(Deserialize)]
struct Resource<T> {
    id: String,
    attributes: T,
}

#[derive(Deserialize)]
struct RefundAttributes {
    status: Option<String>,
}

#[derive(Deserialize)]
struct PaymentIntentAttributes {
    status: String,
    amount: i64,
}

/// HTTP client for the payment gateway's REST API.
pub struct GatewayClient {
    http: Client,
    base_url: String,
    secret_key: Option<String>,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.secret_key.is_some()
    }

    fn secret_key(&self) -> Result<&str> {
        self.secret_key
            .as_deref()
            .ok_or_else(|| AppError::Gateway("Payment gateway is not configured".to_string()))
    }

    async fn accepted(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "{} rejected with status {}: {}",
                action, status, body
            )));
        }
        Ok(response)
    }

    async fn read<T: DeserializeOwned>(response: Response, action: &str) -> Result<Envelope<T>> {
        let response = Self::accepted(response, action).await?;

        response
            .json::<Envelope<T>>()
            .await
            .map_err(|e| AppError::Gateway(format!("Unexpected {} response: {}", action, e)))
    }
}

#[async_trait]
impl PaymentGateway for GatewayClient {
    async fn create_refund(&self, request: &GatewayRefundRequest) -> Result<GatewayRefund> {
        let body = json!({
            "data": {
                "attributes": {
                    "amount": request.amount,
                    "payment_intent": request.payment_intent_id,
                    "reason": request.reason,
                    "metadata": request.metadata,
                }
            }
        });

        let response = self
            .http
            .post(format!("{}/refunds", self.base_url))
            .basic_auth(self.secret_key()?, Some(""))
            .json(&body)
            .send()
            .await?;

        let response = Self::accepted(response, "Refund").await?;

        // A 2xx means the refund was accepted, so an unreadable body must not
        // look like a rejection
        let refund = response
            .json::<Envelope<RefundAttributes>>()
            .await
            .map_err(|e| AppError::GatewayUnconfirmed(format!("Unreadable refund response: {}", e)))?;

        // `processing` is reserved for the local refund claim
        let reported = refund.data.attributes.status.as_deref().unwrap_or_default();
        let status = match RefundStatus::from_str(reported) {
            Some(RefundStatus::Processing) => RefundStatus::Pending,
            Some(status) => status,
            None => {
                tracing::warn!(
                    refund_id = %refund.data.id,
                    status = %reported,
                    "Unrecognized refund status from gateway, recording as pending"
                );
                RefundStatus::Pending
            }
        };

        Ok(GatewayRefund {
            id: refund.data.id,
            status,
        })
    }

    async fn get_payment_intent(&self, payment_intent_id: &str) -> Result<GatewayPaymentIntent> {
        let response = self
            .http
            .get(format!("{}/payment_intents/{}", self.base_url, payment_intent_id))
            .basic_auth(self.secret_key()?, Some(""))
            .send()
            .await?;

        let intent = Self::read::<PaymentIntentAttributes>(response, "Payment intent lookup").await?;

        Ok(GatewayPaymentIntent {
            id: intent.data.id,
            status: intent.data.attributes.status,
            amount: intent.data.attributes.amount,
        })
    }
}
