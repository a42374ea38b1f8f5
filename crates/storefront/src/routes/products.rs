//! Product route handlers.
//!
//! Product pages come from the page cache. Pre-rendered pages are served
//! directly; any other product renders a loading placeholder on first visit
//! while its page is generated in the background. Responses keep the default
//! `no-store` because the buy form embeds a per-render idempotency key.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::HeaderName,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use ignite_shop_core::{PriceId, ProductId};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::catalog::ProductDetail;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::pages::Fallback;
use crate::state::AppState;

use super::api::checkout::start_checkout;

/// Seconds between reloads of the loading placeholder.
const LOADING_REFRESH_SECS: u32 = 1;

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: Arc<ProductDetail>,
    /// Fresh per render so that double submissions create one checkout.
    pub idempotency_key: String,
}

/// Placeholder shown while a product page is generated.
#[derive(Template, WebTemplate)]
#[template(path = "products/loading.html")]
pub struct LoadingTemplate {
    pub refresh_secs: u32,
}

/// Buy form fields.
#[derive(Debug, Deserialize)]
pub struct BuyForm {
    pub price_id: String,
    pub idempotency_key: Option<String>,
}

fn parse_product_id(raw: &str) -> Result<ProductId> {
    ProductId::parse(raw).map_err(|e| AppError::NotFound(format!("product: {e}")))
}

/// Display product detail page.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let id = parse_product_id(&id)?;

    match state.product_page(&id).await {
        Fallback::Ready(product) => {
            let template = ProductShowTemplate {
                product,
                idempotency_key: Uuid::new_v4().to_string(),
            };
            // Each render carries its own idempotency key, so the page is never
            // shared through HTTP caches.
            Ok(template.into_response())
        }
        Fallback::Loading => {
            tracing::debug!(product_id = %id, "Rendering fallback while page generates");
            let refresh: [(HeaderName, String); 1] =
                [(HeaderName::from_static("refresh"), LOADING_REFRESH_SECS.to_string())];
            Ok((
                AppendHeaders(refresh),
                LoadingTemplate {
                    refresh_secs: LOADING_REFRESH_SECS,
                },
            )
                .into_response())
        }
        Fallback::Failed(err) => Err(err.into()),
    }
}

/// Start a checkout from the product page form.
///
/// Redirects to the hosted checkout page. On failure the visitor lands back on
/// the product page with the buy button enabled again.
#[instrument(skip(state, form))]
pub async fn buy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<BuyForm>,
) -> Result<Redirect> {
    let id = parse_product_id(&id)?;
    let product_url = format!("/product/{id}");

    add_breadcrumb("checkout", "Buy button submitted", &[("product_id", id.as_str())]);

    let price_id = match PriceId::parse(form.price_id.trim()) {
        Ok(price_id) => price_id,
        Err(e) => {
            tracing::warn!(product_id = %id, error = %e, "Rejected buy form with invalid price");
            return Ok(Redirect::to(&product_url));
        }
    };

    match start_checkout(&state, price_id, form.idempotency_key).await {
        Ok(checkout_url) => Ok(Redirect::to(&checkout_url)),
        Err(e) => {
            tracing::error!(product_id = %id, error = %e, "Failed to start checkout");
            Ok(Redirect::to(&product_url))
        }
    }
}
