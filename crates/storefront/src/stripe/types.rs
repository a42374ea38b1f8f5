//! Wire types for the Stripe REST API.
//!
//! Only the fields the storefront reads are modelled; serde ignores the rest.

use ignite_shop_core::{CheckoutSessionId, PriceId, ProductId};
use serde::Deserialize;

// =============================================================================
// Common Types
// =============================================================================

/// A paginated list object (`"object": "list"`).
#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// Whether more items exist after the last one.
    #[serde(default)]
    pub has_more: bool,
}

/// A field that is either an ID or, when requested via `expand[]`, the object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    /// Bare object ID.
    Id(String),
    /// Expanded object.
    Object(Box<T>),
}

impl<T> Expandable<T> {
    /// The expanded object, if the field was expanded.
    #[must_use]
    pub fn as_object(&self) -> Option<&T> {
        match self {
            Self::Object(object) => Some(object),
            Self::Id(_) => None,
        }
    }
}

/// Error envelope returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ApiError,
}

/// Stripe error object.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// Error category (e.g., `invalid_request_error`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Machine-readable code (e.g., `resource_missing`).
    pub code: Option<String>,
    /// Human-readable message.
    pub message: Option<String>,
}

// =============================================================================
// Catalog Types
// =============================================================================

/// A sellable product.
#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    /// Image URLs, first one is the primary image.
    #[serde(default)]
    pub images: Vec<String>,
    /// Default price; an object when expanded.
    pub default_price: Option<Expandable<Price>>,
}

impl Product {
    /// The expanded default price, if any.
    #[must_use]
    pub fn default_price(&self) -> Option<&Price> {
        self.default_price.as_ref().and_then(Expandable::as_object)
    }

    /// The primary image URL, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// A price attached to a product.
#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: PriceId,
    /// Amount in the smallest currency unit. `None` for custom or tiered prices.
    pub unit_amount: Option<i64>,
    /// Owning product; an object when expanded.
    pub product: Option<Expandable<Product>>,
}

// =============================================================================
// Checkout Types
// =============================================================================

/// A hosted checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: CheckoutSessionId,
    /// Hosted page URL. Only present while the session is open.
    pub url: Option<String>,
    /// Customer details collected during checkout.
    pub customer_details: Option<CustomerDetails>,
    /// Purchased items; only present when expanded.
    pub line_items: Option<List<LineItem>>,
}

/// Customer details collected by the hosted checkout page.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    pub name: Option<String>,
}

/// A purchased line item.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    pub price: Option<Price>,
}

impl LineItem {
    /// The purchased product, if `line_items.data.price.product` was expanded.
    #[must_use]
    pub fn product(&self) -> Option<&Product> {
        self.price
            .as_ref()
            .and_then(|price| price.product.as_ref())
            .and_then(Expandable::as_object)
    }
}

/// Parameters for creating a one-time payment checkout session.
#[derive(Debug, Clone)]
pub struct CreateCheckoutSession {
    /// Price to charge.
    pub price_id: PriceId,
    /// Units of the price.
    pub quantity: u32,
    /// Redirect after payment; may contain `{CHECKOUT_SESSION_ID}`.
    pub success_url: String,
    /// Redirect when the customer backs out.
    pub cancel_url: String,
    /// Sent as `Idempotency-Key` so duplicate submissions create one session.
    pub idempotency_key: Option<String>,
}

impl CreateCheckoutSession {
    /// Form-encoded request body, using Stripe's bracketed array notation.
    #[must_use]
    pub fn form_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("mode", "payment".to_string()),
            ("success_url", self.success_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
            ("line_items[0][price]", self.price_id.to_string()),
            ("line_items[0][quantity]", self.quantity.to_string()),
        ]
    }
}
