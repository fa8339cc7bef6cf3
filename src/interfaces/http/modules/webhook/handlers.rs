//! Webhook handler
//!
//! The body is taken as raw bytes: the signature covers the exact payload,
//! so it must be verified before any JSON decoding.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::PaymentCallbackProcessor;
use crate::infrastructure::crypto::SIGNATURE_HEADER;
use crate::interfaces::http::common::{ApiError, ApiResponse};

#[derive(Clone)]
pub struct WebhookState {
    pub processor: Arc<PaymentCallbackProcessor>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    /// confirmed, duplicate, ignored or no_matching_bookings
    pub outcome: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/webhook",
    tag = "Payments",
    params(("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex HMAC-SHA256>")),
    request_body(content = String, content_type = "application/json", description = "Provider event"),
    responses(
        (status = 200, description = "Event handled or ignored", body = ApiResponse<WebhookAck>),
        (status = 400, description = "Bad signature or payload", body = ApiResponse<String>),
        (status = 413, description = "Body too large", body = ApiResponse<String>),
        (status = 500, description = "Storage failure, provider should retry", body = ApiResponse<String>)
    )
)]
pub async fn payment_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<WebhookAck>>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = state.processor.handle(&body, signature).await?;
    Ok(Json(ApiResponse::success(WebhookAck {
        outcome: outcome.as_str().to_string(),
    })))
}
