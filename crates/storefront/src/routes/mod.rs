//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Catalog carousel (?slide=N)
//! GET  /health                 - Health check
//!
//! # Products
//! GET  /product/{id}           - Product detail (pre-rendered or fallback)
//! POST /product/{id}/buy       - Start checkout, 303 to hosted checkout
//!
//! # Checkout
//! GET  /success                - Purchase confirmation (?session_id=)
//! POST /api/checkout           - Start checkout, JSON {checkoutUrl}
//! ```

pub mod api;
pub mod home;
pub mod products;
pub mod success;

use axum::{
    Router,
    http::{HeaderName, header::CACHE_CONTROL},
    response::AppendHeaders,
    routing::{get, post},
};

use crate::middleware::checkout_rate_limiter;
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new().route("/{id}", get(products::show))
}

/// Create the rate-limited checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/product/{id}/buy", post(products::buy))
        .route("/api/checkout", post(api::checkout::create))
        .layer(checkout_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/product", product_routes())
        .route("/success", get(success::success))
        .merge(checkout_routes())
}

/// `Cache-Control` for generated pages that are identical for every visitor,
/// letting shared caches follow the in-process revalidation window.
pub(crate) fn generated_page_headers(
    state: &AppState,
) -> AppendHeaders<[(HeaderName, String); 1]> {
    let secs = state.config().revalidate.as_secs();
    AppendHeaders([(
        CACHE_CONTROL,
        format!("public, s-maxage={secs}, stale-while-revalidate"),
    )])
}
