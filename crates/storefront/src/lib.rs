//! Ignite Shop storefront library.
//!
//! Server-rendered catalog, product and purchase confirmation pages backed by
//! the Stripe API. The router is exposed as a library so that it can be driven
//! in tests without binding a socket.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod carousel;
pub mod catalog;
pub mod config;
pub mod error;
mod filters;
pub mod middleware;
pub mod pages;
pub mod routes;
pub mod state;
pub mod stripe;

use axum::{
    Router,
    extract::Request,
    middleware::from_fn,
    routing::get,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::state::AppState;

/// Directory served under `/static`, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/storefront/static";

/// Build the storefront router with its middleware stack.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check Stripe.
async fn health() -> &'static str {
    "ok"
}
