//! Checkout API routes.
//!
//! Creates a hosted checkout session for a single price and hands back the URL
//! the browser should navigate to.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use ignite_shop_core::PriceId;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::state::AppState;
use crate::stripe::{CreateCheckoutSession, StripeError};

/// Placeholder Stripe replaces with the session ID in the success URL.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Stripe's limit on idempotency key length.
const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// Request to start a checkout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    pub price_id: String,
    pub idempotency_key: Option<String>,
}

/// Response with the hosted checkout URL.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutResponse {
    pub checkout_url: String,
}

/// Start a checkout and return its URL.
#[instrument(skip(state, request))]
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<impl IntoResponse> {
    let price_id = PriceId::parse(request.price_id.trim())
        .map_err(|e| AppError::BadRequest(format!("priceId: {e}")))?;

    add_breadcrumb("checkout", "Checkout requested", &[("price_id", price_id.as_str())]);

    let checkout_url = start_checkout(&state, price_id, request.idempotency_key).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCheckoutResponse { checkout_url }),
    ))
}

/// Create a one-item payment session and return its hosted page URL.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a malformed idempotency key, or the
/// Stripe error if the session cannot be created.
pub(crate) async fn start_checkout(
    state: &AppState,
    price_id: PriceId,
    idempotency_key: Option<String>,
) -> Result<String> {
    let idempotency_key = idempotency_key
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .map(|key| {
            if is_valid_idempotency_key(&key) {
                Ok(key)
            } else {
                Err(AppError::BadRequest("idempotencyKey is malformed".to_string()))
            }
        })
        .transpose()?;

    let base = state.config().base_url.as_str().trim_end_matches('/');
    let params = CreateCheckoutSession {
        price_id,
        quantity: 1,
        success_url: format!("{base}/success?session_id={SESSION_ID_PLACEHOLDER}"),
        cancel_url: format!("{base}/"),
        idempotency_key,
    };

    let session = state.stripe().create_checkout_session(&params).await?;
    let url = session.url.ok_or(StripeError::MissingField("url"))?;

    tracing::info!(session_id = %session.id, price_id = %params.price_id, "Checkout session created");
    Ok(url)
}

fn is_valid_idempotency_key(key: &str) -> bool {
    key.len() <= MAX_IDEMPOTENCY_KEY_LEN && key.bytes().all(|b| b.is_ascii_graphic())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_key_validation() {
        assert!(is_valid_idempotency_key("0b5c8a3e-5f0e-4a4e-9a59-3e9f7f7c2d11"));
        assert!(!is_valid_idempotency_key("has space"));
        assert!(!is_valid_idempotency_key(&"k".repeat(256)));
    }

    #[test]
    fn test_request_uses_camel_case() {
        let request: CreateCheckoutRequest =
            serde_json::from_str(r#"{"priceId":"price_1","idempotencyKey":"abc"}"#)
                .unwrap();
        assert_eq!(request.price_id, "price_1");
        assert_eq!(request.idempotency_key.as_deref(), Some("abc"));

        let body = serde_json::to_value(CreateCheckoutResponse {
            checkout_url: "https://pay.example/abc".to_string(),
        })
        .unwrap();
        assert_eq!(body["checkoutUrl"], "https://pay.example/abc");
    }
}
