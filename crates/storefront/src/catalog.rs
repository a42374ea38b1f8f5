//! Display models built from Stripe catalog objects.
//!
//! Prices are rendered in BRL with `pt-BR` conventions. A product whose
//! default price carries no `unit_amount` cannot be displayed as priced; what
//! happens to it is decided by [`UnpricedPolicy`].

use std::fmt;
use std::str::FromStr;

use ignite_shop_core::{CheckoutSessionId, CurrencyCode, Price as DisplayPrice, PriceId, ProductId};
use thiserror::Error;

use tracing::instrument;

use crate::stripe::{CheckoutSession, LineItem, Price, Product, StripeClient, StripeError};

/// Price label used for unpriced products under [`UnpricedPolicy::Placeholder`].
pub const UNAVAILABLE_PRICE: &str = "Indisponível";

/// Errors produced while building display models.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Stripe request failed.
    #[error(transparent)]
    Stripe(#[from] StripeError),

    /// Product has no displayable price and the policy hides it.
    #[error("Product {0} has no unit amount")]
    Unpriced(ProductId),

    /// Checkout session has no purchased product to show.
    #[error("Checkout session {0} has no expanded line item product")]
    EmptySession(CheckoutSessionId),
}

impl CatalogError {
    /// Whether the error should be reported to the visitor as "not found".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::Stripe(err) => err.is_not_found(),
            Self::Unpriced(_) | Self::EmptySession(_) => true,
        }
    }
}

/// Policy for products whose default price has no unit amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnpricedPolicy {
    /// Leave them out of the catalog; their detail page is a 404.
    #[default]
    Hide,
    /// Show them as unavailable with the buy action disabled.
    Placeholder,
}

impl FromStr for UnpricedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hide" => Ok(Self::Hide),
            "placeholder" => Ok(Self::Placeholder),
            other => Err(format!("expected 'hide' or 'placeholder', got '{other}'")),
        }
    }
}

impl fmt::Display for UnpricedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hide => "hide",
            Self::Placeholder => "placeholder",
        })
    }
}

// =============================================================================
// Display Models
// =============================================================================

/// A product as listed on the catalog page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    pub price: String,
}

/// A product as shown on its detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDetail {
    pub id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    pub price: String,
    pub description: String,
    pub default_price_id: Option<PriceId>,
    /// False when the product is shown under the placeholder policy.
    pub purchasable: bool,
}

/// What the success page shows about a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseSummary {
    pub customer_name: Option<String>,
    pub product_name: String,
    pub product_image_url: Option<String>,
}

// =============================================================================
// Conversions
// =============================================================================

/// Format a Stripe price, if it has a unit amount.
#[must_use]
pub fn format_price(price: &Price) -> Option<String> {
    price
        .unit_amount
        .map(|units| DisplayPrice::from_minor_units(units, CurrencyCode::BRL).to_string())
}

fn displayable_price(product: &Product) -> Option<String> {
    product.default_price().and_then(format_price)
}

/// Map one catalog item to its summary, or `None` if the policy hides it.
#[must_use]
pub fn product_summary(product: &Product, policy: UnpricedPolicy) -> Option<ProductSummary> {
    let price = match (displayable_price(product), policy) {
        (Some(price), _) => price,
        (None, UnpricedPolicy::Placeholder) => UNAVAILABLE_PRICE.to_string(),
        (None, UnpricedPolicy::Hide) => {
            tracing::warn!(product_id = %product.id, "Hiding product without unit amount");
            return None;
        }
    };

    Some(ProductSummary {
        id: product.id.clone(),
        name: product.name.clone(),
        image_url: product.primary_image().map(String::from),
        price,
    })
}

/// Map a catalog listing to summaries, preserving provider order.
#[must_use]
pub fn summarize_products(products: &[Product], policy: UnpricedPolicy) -> Vec<ProductSummary> {
    products
        .iter()
        .filter_map(|product| product_summary(product, policy))
        .collect()
}

/// Map a single product to its detail view.
///
/// # Errors
///
/// Returns `CatalogError::Unpriced` if the product has no unit amount and
/// the policy hides such products.
pub fn product_detail(
    product: Product,
    policy: UnpricedPolicy,
) -> Result<ProductDetail, CatalogError> {
    let formatted = displayable_price(&product);
    let default_price_id = product.default_price().map(|price| price.id.clone());

    let (price, purchasable) = match (formatted, policy) {
        (Some(price), _) => (price, default_price_id.is_some()),
        (None, UnpricedPolicy::Placeholder) => (UNAVAILABLE_PRICE.to_string(), false),
        (None, UnpricedPolicy::Hide) => return Err(CatalogError::Unpriced(product.id)),
    };

    let image_url = product.primary_image().map(String::from);

    Ok(ProductDetail {
        id: product.id,
        name: product.name,
        image_url,
        price,
        description: product.description.unwrap_or_default(),
        default_price_id,
        purchasable,
    })
}

/// Extract the customer name and first purchased product from a session.
///
/// # Errors
///
/// Returns `CatalogError::EmptySession` if the session has no line item
/// with an expanded product.
pub fn purchase_summary(session: CheckoutSession) -> Result<PurchaseSummary, CatalogError> {
    let product = session
        .line_items
        .as_ref()
        .and_then(|items| items.data.first())
        .and_then(LineItem::product)
        .ok_or_else(|| CatalogError::EmptySession(session.id.clone()))?;

    Ok(PurchaseSummary {
        customer_name: session
            .customer_details
            .as_ref()
            .and_then(|details| details.name.clone())
            .filter(|name| !name.trim().is_empty()),
        product_name: product.name.clone(),
        product_image_url: product.primary_image().map(String::from),
    })
}

// =============================================================================
// Loaders
// =============================================================================

/// Fetch the catalog listing shown on the home page.
///
/// # Errors
///
/// Returns an error if the Stripe listing fails.
#[instrument(skip(stripe))]
pub async fn load_catalog(
    stripe: &StripeClient,
    policy: UnpricedPolicy,
) -> Result<Vec<ProductSummary>, CatalogError> {
    let products = stripe.list_products().await?;
    Ok(summarize_products(&products, policy))
}

/// Fetch one product for its detail page.
///
/// # Errors
///
/// Returns an error if the product cannot be retrieved or the policy hides it.
#[instrument(skip(stripe, id), fields(product_id = %id))]
pub async fn load_product_detail(
    stripe: &StripeClient,
    id: &ProductId,
    policy: UnpricedPolicy,
) -> Result<ProductDetail, CatalogError> {
    let product = stripe.retrieve_product(id).await?;
    product_detail(product, policy)
}

/// Fetch the completed checkout shown on the success page.
///
/// # Errors
///
/// Returns an error if the session cannot be retrieved or has no product.
#[instrument(skip(stripe, id), fields(session_id = %id))]
pub async fn load_purchase(
    stripe: &StripeClient,
    id: &CheckoutSessionId,
) -> Result<PurchaseSummary, CatalogError> {
    let session = stripe.retrieve_checkout_session(id).await?;
    purchase_summary(session)
}
