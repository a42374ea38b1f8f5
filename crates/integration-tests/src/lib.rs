//! Integration test harness for Ignite Shop.
//!
//! Tests drive the real storefront router in-process with
//! `tower::ServiceExt::oneshot`, against a fake Stripe API served by axum on
//! an ephemeral port. No network access or Stripe account is needed.
//!
//! ```rust,ignore
//! let app = TestApp::spawn(Fixtures::default().with_product(product_json(
//!     "prod_1", "Camiseta X", Some(7990),
//! ))).await;
//! let response = app.get("/").await;
//! assert_eq!(response.status, StatusCode::OK);
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Form, Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use ignite_shop_core::ProductId;
use ignite_shop_storefront::{
    catalog::UnpricedPolicy,
    config::{StorefrontConfig, StripeConfig},
    state::AppState,
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

/// Product pre-rendered at startup by default.
pub const PRERENDERED_PRODUCT: &str = "prod_NfE4lTcDsvEtJq";

/// Public base URL the storefront is configured with.
pub const BASE_URL: &str = "http://localhost:3000";

// =============================================================================
// Fake Stripe API
// =============================================================================

/// Data served by the fake Stripe API.
#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    pub products: Vec<Value>,
    pub sessions: HashMap<String, Value>,
    /// URL returned for created checkout sessions; `None` makes creation fail.
    pub checkout_url: Option<String>,
    /// Products per list page; `None` returns everything in one page.
    pub page_size: Option<usize>,
}

impl Fixtures {
    #[must_use]
    pub fn with_product(mut self, product: Value) -> Self {
        self.products.push(product);
        self
    }

    #[must_use]
    pub fn with_session(mut self, id: &str, session: Value) -> Self {
        self.sessions.insert(id.to_string(), session);
        self
    }

    #[must_use]
    pub fn with_checkout_url(mut self, url: &str) -> Self {
        self.checkout_url = Some(url.to_string());
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

/// A checkout session creation received by the fake API.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub form: HashMap<String, String>,
    pub idempotency_key: Option<String>,
}

#[derive(Default)]
struct FakeStripeState {
    fixtures: Fixtures,
    requests: Vec<String>,
    created: Vec<CreatedSession>,
}

/// Handle to a running fake Stripe API.
#[derive(Clone)]
pub struct FakeStripe {
    pub base_url: Url,
    state: Arc<Mutex<FakeStripeState>>,
}

fn lock(state: &Mutex<FakeStripeState>) -> MutexGuard<'_, FakeStripeState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_found(kind: &str, id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "type": "invalid_request_error",
                "code": "resource_missing",
                "message": format!("No such {kind}: '{id}'"),
                "param": "id"
            }
        })),
    )
        .into_response()
}

async fn list_products(
    State(state): State<Arc<Mutex<FakeStripeState>>>,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    let mut state = lock(&state);
    let starting_after = query
        .into_iter()
        .find(|(key, _)| key == "starting_after")
        .map(|(_, value)| value);

    state.requests.push(match &starting_after {
        Some(cursor) => format!("GET /v1/products?starting_after={cursor}"),
        None => "GET /v1/products".to_string(),
    });

    let products = &state.fixtures.products;
    let start = starting_after
        .and_then(|cursor| products.iter().position(|p| p["id"] == cursor.as_str()))
        .map_or(0, |i| i + 1);
    let end = state
        .fixtures
        .page_size
        .map_or(products.len(), |size| (start + size).min(products.len()));

    Json(json!({
        "object": "list",
        "data": products.get(start..end).unwrap_or_default(),
        "has_more": end < products.len()
    }))
    .into_response()
}

async fn retrieve_product(
    State(state): State<Arc<Mutex<FakeStripeState>>>,
    Path(id): Path<String>,
) -> Response {
    let mut state = lock(&state);
    state.requests.push(format!("GET /v1/products/{id}"));
    state
        .fixtures
        .products
        .iter()
        .find(|p| p["id"] == id.as_str())
        .map_or_else(|| not_found("product", &id), |p| Json(p.clone()).into_response())
}

async fn retrieve_session(
    State(state): State<Arc<Mutex<FakeStripeState>>>,
    Path(id): Path<String>,
) -> Response {
    let mut state = lock(&state);
    state.requests.push(format!("GET /v1/checkout/sessions/{id}"));
    state
        .fixtures
        .sessions
        .get(&id)
        .map_or_else(|| not_found("checkout.session", &id), |s| Json(s.clone()).into_response())
}

async fn create_session(
    State(state): State<Arc<Mutex<FakeStripeState>>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let mut state = lock(&state);
    state.requests.push("POST /v1/checkout/sessions".to_string());
    state.created.push(CreatedSession {
        form,
        idempotency_key: headers
            .get("idempotency-key")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    });

    match &state.fixtures.checkout_url {
        Some(url) => Json(json!({
            "id": "cs_test_created",
            "object": "checkout.session",
            "url": url,
            "status": "open"
        }))
        .into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "type": "api_error", "message": "unavailable" } })),
        )
            .into_response(),
    }
}

impl FakeStripe {
    /// Serve `fixtures` on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn(fixtures: Fixtures) -> Self {
        let state = Arc::new(Mutex::new(FakeStripeState {
            fixtures,
            ..FakeStripeState::default()
        }));

        let router = Router::new()
            .route("/v1/products", get(list_products))
            .route("/v1/products/{id}", get(retrieve_product))
            .route(
                "/v1/checkout/sessions",
                axum::routing::post(create_session),
            )
            .route("/v1/checkout/sessions/{id}", get(retrieve_session))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("Failed to bind fake Stripe listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Fake Stripe server error");
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).expect("Invalid fake Stripe URL"),
            state,
        }
    }

    /// Requests received so far, as `METHOD /path`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        lock(&self.state).requests.clone()
    }

    /// Forget recorded requests.
    pub fn clear_requests(&self) {
        lock(&self.state).requests.clear();
    }

    /// Checkout session creations received so far.
    #[must_use]
    pub fn created_sessions(&self) -> Vec<CreatedSession> {
        lock(&self.state).created.clone()
    }
}

// =============================================================================
// Fixture Builders
// =============================================================================

/// A Stripe product with an expanded default price.
#[must_use]
pub fn product_json(id: &str, name: &str, unit_amount: Option<i64>) -> Value {
    json!({
        "id": id,
        "object": "product",
        "active": true,
        "name": name,
        "description": format!("Descrição de {name}"),
        "images": [format!("https://files.example/{id}.png")],
        "default_price": {
            "id": format!("price_{id}"),
            "object": "price",
            "unit_amount": unit_amount,
            "currency": "brl",
            "product": id
        }
    })
}

/// A completed checkout session with one expanded line item.
#[must_use]
pub fn session_json(id: &str, customer_name: &str, product_name: &str, image: &str) -> Value {
    json!({
        "id": id,
        "object": "checkout.session",
        "url": null,
        "status": "complete",
        "payment_status": "paid",
        "customer_details": { "name": customer_name, "email": "cliente@example.com" },
        "line_items": {
            "object": "list",
            "has_more": false,
            "data": [{
                "id": "li_1",
                "quantity": 1,
                "price": {
                    "id": "price_1",
                    "unit_amount": 7990,
                    "currency": "brl",
                    "product": { "id": "prod_1", "name": product_name, "images": [image] }
                }
            }]
        }
    })
}

// =============================================================================
// Storefront Harness
// =============================================================================

/// A collected storefront response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Value of a response header, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Storefront router wired to a fake Stripe API.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub stripe: FakeStripe,
}

impl TestApp {
    /// Start a fake Stripe API and a pre-rendered storefront on top of it.
    pub async fn spawn(fixtures: Fixtures) -> Self {
        Self::spawn_with_policy(fixtures, UnpricedPolicy::Hide).await
    }

    /// Like [`TestApp::spawn`] with an explicit unpriced-product policy.
    ///
    /// # Panics
    ///
    /// Panics if the storefront state cannot be built.
    pub async fn spawn_with_policy(fixtures: Fixtures, unpriced_policy: UnpricedPolicy) -> Self {
        let stripe = FakeStripe::spawn(fixtures).await;
        let config = test_config(&stripe, unpriced_policy);
        let state = AppState::new(config).expect("Failed to build app state");
        state.prerender().await;

        Self {
            router: ignite_shop_storefront::app(state.clone()),
            state,
            stripe,
        }
    }

    /// Send a request through the router and collect the response.
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body is not UTF-8.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");

        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8"),
        }
    }

    /// `GET` a path.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::get(uri)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    /// `POST` a form to a rate-limited checkout endpoint.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn post_form(&self, uri: &str, body: &str) -> TestResponse {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("x-forwarded-for", "203.0.113.10")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        self.send(request).await
    }

    /// `POST` JSON to a rate-limited checkout endpoint.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn post_json(&self, uri: &str, body: &Value) -> TestResponse {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.10")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Poll a product page until it is no longer the loading placeholder.
    ///
    /// # Panics
    ///
    /// Panics if the page is still loading after five seconds.
    pub async fn get_resolved(&self, uri: &str) -> TestResponse {
        for _ in 0..500 {
            let response = self.get(uri).await;
            if response.header("refresh").is_none() {
                return response;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{uri} never left the loading placeholder");
    }
}

/// Storefront configuration pointing at `stripe`.
///
/// # Panics
///
/// Panics if the built-in URLs fail to parse.
#[must_use]
pub fn test_config(stripe: &FakeStripe, unpriced_policy: UnpricedPolicy) -> StorefrontConfig {
    StorefrontConfig {
        host: "127.0.0.1".parse().expect("Invalid host"),
        port: 3000,
        base_url: Url::parse(BASE_URL).expect("Invalid base URL"),
        revalidate: Duration::from_secs(7200),
        prerendered_products: vec![
            ProductId::parse(PRERENDERED_PRODUCT).expect("Invalid product ID"),
        ],
        unpriced_policy,
        stripe: StripeConfig {
            api_base: stripe.base_url.clone(),
            secret_key: SecretString::from("sk_test_integration"),
            timeout: Duration::from_secs(5),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}
