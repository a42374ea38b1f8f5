//! Stripe API client implementation.

use std::sync::Arc;

use ignite_shop_core::{CheckoutSessionId, ProductId};
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::StripeConfig;

use super::StripeError;
use super::types::{CheckoutSession, CreateCheckoutSession, ErrorResponse, List, Product};

/// Page size for list endpoints (Stripe's maximum).
const LIST_PAGE_SIZE: &str = "100";

/// Client for the Stripe REST API.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: Url,
    secret_key: SecretString,
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("ignite-shop/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: config.api_base.clone(),
                secret_key: config.secret_key.clone(),
            }),
        })
    }

    /// Build an endpoint URL under the configured API base.
    ///
    /// Each segment is percent-encoded, so IDs can never add path levels.
    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.inner.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    /// Send an authenticated request and decode the JSON response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StripeError> {
        let response = request
            .bearer_auth(self.inner.secret_key.expose_secret())
            .send()
            .await?;

        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(StripeError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            let api_error = serde_json::from_str::<ErrorResponse>(&response_text)
                .map(|body| body.error)
                .ok();

            if status == reqwest::StatusCode::NOT_FOUND {
                let message = api_error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "resource missing".to_string());
                return Err(StripeError::NotFound(message));
            }

            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Stripe API returned non-success status"
            );

            return Err(match api_error {
                Some(e) => StripeError::Api {
                    status: status.as_u16(),
                    kind: e.kind,
                    code: e.code,
                    message: e.message.unwrap_or_default(),
                },
                None => StripeError::Api {
                    status: status.as_u16(),
                    kind: "unknown".to_string(),
                    code: None,
                    message: response_text.chars().take(200).collect(),
                },
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse Stripe response"
            );
            StripeError::Parse(e)
        })
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List all active products with their default price expanded.
    ///
    /// Follows `has_more` pagination until the whole catalog is fetched.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, StripeError> {
        let mut products = Vec::new();
        let mut starting_after: Option<String> = None;

        loop {
            let mut query = vec![
                ("active", "true"),
                ("limit", LIST_PAGE_SIZE),
                ("expand[]", "data.default_price"),
            ];
            if let Some(cursor) = starting_after.as_deref() {
                query.push(("starting_after", cursor));
            }

            let url = self.endpoint(&["v1", "products"], &query);
            let page: List<Product> = self.send(self.inner.client.get(url)).await?;

            starting_after = page.data.last().map(|p| p.id.to_string());
            let has_more = page.has_more && starting_after.is_some();
            products.extend(page.data);

            if !has_more {
                break;
            }
        }

        debug!(count = products.len(), "Fetched product catalog");
        Ok(products)
    }

    /// Retrieve a product with its default price expanded.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::NotFound` if the product does not exist, or
    /// another error if the API request fails.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn retrieve_product(&self, id: &ProductId) -> Result<Product, StripeError> {
        let url = self.endpoint(
            &["v1", "products", id.as_str()],
            &[("expand[]", "default_price")],
        );
        self.send(self.inner.client.get(url)).await
    }

    // =========================================================================
    // Checkout Methods
    // =========================================================================

    /// Retrieve a checkout session with line items and their products expanded.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::NotFound` if the session does not exist, or
    /// another error if the API request fails.
    #[instrument(skip(self, id), fields(session_id = %id))]
    pub async fn retrieve_checkout_session(
        &self,
        id: &CheckoutSessionId,
    ) -> Result<CheckoutSession, StripeError> {
        let url = self.endpoint(
            &["v1", "checkout", "sessions", id.as_str()],
            &[
                ("expand[]", "line_items"),
                ("expand[]", "line_items.data.price.product"),
            ],
        );
        self.send(self.inner.client.get(url)).await
    }

    /// Create a hosted checkout session and return it.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, params), fields(price_id = %params.price_id))]
    pub async fn create_checkout_session(
        &self,
        params: &CreateCheckoutSession,
    ) -> Result<CheckoutSession, StripeError> {
        let url = self.endpoint(&["v1", "checkout", "sessions"], &[]);
        let mut request = self.inner.client.post(url).form(&params.form_params());
        if let Some(key) = &params.idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let session: CheckoutSession = self.send(request).await?;
        debug!(session_id = %session.id, "Created checkout session");
        Ok(session)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client(api_base: &str) -> StripeClient {
        StripeClient::new(&StripeConfig {
            api_base: Url::parse(api_base).unwrap(),
            secret_key: SecretString::from("sk_test_1"),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_base_and_path() {
        let url = client("https://api.stripe.com").endpoint(&["v1", "products"], &[]);
        assert_eq!(url.as_str(), "https://api.stripe.com/v1/products");
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let url = client("http://127.0.0.1:12111/stripe/")
            .endpoint(&["v1", "products", "prod_1"], &[]);
        assert_eq!(url.as_str(), "http://127.0.0.1:12111/stripe/v1/products/prod_1");
    }

    #[test]
    fn test_endpoint_encodes_expand_params() {
        let url = client("https://api.stripe.com").endpoint(
            &["v1", "products", "prod_1"],
            &[("expand[]", "default_price")],
        );
        assert_eq!(
            url.as_str(),
            "https://api.stripe.com/v1/products/prod_1?expand%5B%5D=default_price"
        );
    }

    #[test]
    fn test_endpoint_keeps_ids_in_one_segment() {
        let api = client("https://api.stripe.com");

        let url = api.endpoint(&["v1", "products", "camiseta-azul"], &[]);
        assert_eq!(url.as_str(), "https://api.stripe.com/v1/products/camiseta-azul");

        let url = api.endpoint(&["v1", "products", "a/b?c#d"], &[]);
        assert_eq!(url.path(), "/v1/products/a%2Fb%3Fc%23d");
        assert_eq!(url.query(), None);
        assert_eq!(url.path_segments().unwrap().count(), 3);
    }
}
