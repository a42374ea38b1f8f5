//! Stripe REST API client.
//!
//! # Architecture
//!
//! - Plain `reqwest` calls against the versioned REST endpoints (`/v1/...`)
//! - Stripe is the source of truth - NO local sync, direct API calls
//! - Caching of generated pages lives in [`crate::pages`], not here
//!
//! # Endpoints used
//!
//! - `GET  /v1/products` (with `data.default_price` expanded)
//! - `GET  /v1/products/{id}` (with `default_price` expanded)
//! - `GET  /v1/checkout/sessions/{id}` (with line items and products expanded)
//! - `POST /v1/checkout/sessions`
//!
//! # Example
//!
//! ```rust,ignore
//! use ignite_shop_storefront::stripe::StripeClient;
//!
//! let client = StripeClient::new(&config.stripe)?;
//! let products = client.list_products().await?;
//! ```

mod client;
pub mod types;

pub use client::StripeClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe returned an error object.
    #[error("Stripe API error (HTTP {status}, {kind}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Stripe error type (e.g., `invalid_request_error`).
        kind: String,
        /// Stripe error code (e.g., `resource_missing`).
        code: Option<String>,
        /// Human readable message.
        message: String,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Stripe.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field the storefront relies on was absent from the response.
    #[error("Missing field in Stripe response: {0}")]
    MissingField(&'static str),
}

impl StripeError {
    /// Whether the error means the requested object does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
