use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};

use crate::{
    api::state::AppState,
    error::Result,
    payments::webhook::SIGNATURE_HEADER,
    service::WebhookOutcome,
};

/// Gateway webhook. Any 2xx acknowledges the delivery; errors make the
/// gateway redeliver.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookOutcome>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state.service_context.webhook_service
        .handle(&body, signature)
        .await?;

    Ok(Json(outcome))
}
