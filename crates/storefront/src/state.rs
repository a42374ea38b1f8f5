//! Application state shared across handlers.

use std::sync::Arc;

use ignite_shop_core::ProductId;
use tracing::{info, warn};

use crate::catalog::{self, CatalogError, ProductDetail, ProductSummary};
use crate::config::StorefrontConfig;
use crate::pages::{FAILURE_TTL, PageCache};
use crate::stripe::{StripeClient, StripeError};

/// Cache key for the single catalog page.
const CATALOG_KEY: &str = "/";

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the Stripe client, configuration, and generated-page caches.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    stripe: StripeClient,
    catalog_pages: PageCache<Vec<ProductSummary>, CatalogError>,
    product_pages: PageCache<ProductDetail, CatalogError>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the Stripe HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StripeError> {
        let stripe = StripeClient::new(&config.stripe)?;
        let catalog_pages = PageCache::new("catalog", config.revalidate, FAILURE_TTL);
        let product_pages = PageCache::new("product", config.revalidate, FAILURE_TTL);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                stripe,
                catalog_pages,
                product_pages,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the Stripe API client.
    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    /// Get the catalog page, generating it on first use.
    ///
    /// # Errors
    ///
    /// Returns the generation error if the catalog has never been generated
    /// and the Stripe listing fails.
    pub async fn catalog(&self) -> Result<Arc<Vec<ProductSummary>>, Arc<CatalogError>> {
        let stripe = self.inner.stripe.clone();
        let policy = self.inner.config.unpriced_policy;
        self.inner
            .catalog_pages
            .get_or_generate(CATALOG_KEY, move || async move {
                catalog::load_catalog(&stripe, policy).await
            })
            .await
    }

    /// Look up a product page without waiting for Stripe.
    ///
    /// Starts a background generation when the page is missing.
    pub async fn product_page(
        &self,
        id: &ProductId,
    ) -> crate::pages::Fallback<ProductDetail, CatalogError> {
        let stripe = self.inner.stripe.clone();
        let policy = self.inner.config.unpriced_policy;
        let product_id = id.clone();
        self.inner
            .product_pages
            .get_or_fallback(id.as_str(), move || async move {
                catalog::load_product_detail(&stripe, &product_id, policy).await
            })
            .await
    }

    /// Generate the catalog and configured product pages ahead of traffic.
    ///
    /// Failures are logged and left to on-demand generation.
    pub async fn prerender(&self) {
        let stripe = &self.inner.stripe;
        let policy = self.inner.config.unpriced_policy;

        match self
            .inner
            .catalog_pages
            .prerender(CATALOG_KEY, || catalog::load_catalog(stripe, policy))
            .await
        {
            Ok(()) => info!("Catalog page pre-rendered"),
            Err(e) => warn!(error = %e, "Failed to pre-render catalog page"),
        }

        for id in &self.inner.config.prerendered_products {
            match self
                .inner
                .product_pages
                .prerender(id.as_str(), || catalog::load_product_detail(stripe, id, policy))
                .await
            {
                Ok(()) => info!(product_id = %id, "Product page pre-rendered"),
                Err(e) => warn!(product_id = %id, error = %e, "Failed to pre-render product page"),
            }
        }
    }

    /// Whether the product page is already generated.
    #[must_use]
    pub fn has_product_page(&self, id: &ProductId) -> bool {
        self.inner.product_pages.contains(id.as_str())
    }
}
