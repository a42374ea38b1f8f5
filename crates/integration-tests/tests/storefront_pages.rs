//! Integration tests for the catalog, product and success pages.
//!
//! Each test runs the storefront router in-process against a fake Stripe API.

use axum::http::StatusCode;
use ignite_shop_integration_tests::{
    Fixtures, PRERENDERED_PRODUCT, TestApp, product_json, session_json,
};
use ignite_shop_storefront::catalog::{UNAVAILABLE_PRICE, UnpricedPolicy};

fn idempotency_key(body: &str) -> &str {
    let marker = "name=\"idempotency_key\" value=\"";
    let start = body.find(marker).expect("buy form has an idempotency key") + marker.len();
    let len = body[start..].find('"').expect("attribute is closed");
    &body[start..start + len]
}

fn catalog(count: usize) -> Fixtures {
    (0..count).fold(Fixtures::default(), |fixtures, i| {
        fixtures.with_product(product_json(
            &format!("prod_{i}"),
            &format!("Camiseta {i}"),
            Some(7990 + i64::try_from(i).expect("small index") * 1000),
        ))
    })
}

// ============================================================================
// Catalog Page
// ============================================================================

#[tokio::test]
async fn test_catalog_formats_prices_in_brl() {
    let app = TestApp::spawn(
        Fixtures::default()
            .with_product(product_json("prod_a", "Camiseta Beyond", Some(7990)))
            .with_product(product_json("prod_b", "Camiseta Explorer", Some(123_456))),
    )
    .await;

    let response = app.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("<title>Home | Ignite Shop</title>"));
    assert!(response.body.contains("Camiseta Beyond"));
    assert!(response.body.contains("R$\u{a0}79,90"));
    assert!(response.body.contains("R$\u{a0}1.234,56"));
    assert!(response.body.contains("href=\"/product/prod_a\""));
}

#[tokio::test]
async fn test_catalog_is_generated_once_per_window() {
    let app = TestApp::spawn(catalog(2)).await;
    app.stripe.clear_requests();

    app.get("/").await;
    app.get("/").await;

    assert!(
        app.stripe.requests().iter().all(|r| r != "GET /v1/products"),
        "pre-rendered catalog should be served from cache"
    );
}

#[tokio::test]
async fn test_catalog_follows_list_pagination() {
    let app = TestApp::spawn(catalog(5).with_page_size(2)).await;

    let products = app.state.catalog().await.expect("catalog loads");
    assert_eq!(products.len(), 5);

    let list_requests: Vec<String> = app
        .stripe
        .requests()
        .into_iter()
        .filter(|r| r.starts_with("GET /v1/products") && !r.starts_with("GET /v1/products/"))
        .collect();
    assert_eq!(
        list_requests,
        [
            "GET /v1/products",
            "GET /v1/products?starting_after=prod_1",
            "GET /v1/products?starting_after=prod_3",
        ]
    );

    let response = app.get("/?slide=2").await;
    assert!(response.body.contains("Camiseta 4"));
}

#[tokio::test]
async fn test_catalog_hides_unpriced_products_by_default() {
    let app = TestApp::spawn(
        Fixtures::default()
            .with_product(product_json("prod_a", "Camiseta Beyond", Some(7990)))
            .with_product(product_json("prod_b", "Caneca Sem Preço", None)),
    )
    .await;

    let response = app.get("/").await;

    assert!(response.body.contains("Camiseta Beyond"));
    assert!(!response.body.contains("Caneca Sem Preço"));
}

#[tokio::test]
async fn test_catalog_placeholder_policy_shows_unavailable() {
    let app = TestApp::spawn_with_policy(
        Fixtures::default().with_product(product_json("prod_b", "Caneca Sem Preço", None)),
        UnpricedPolicy::Placeholder,
    )
    .await;

    let response = app.get("/").await;

    assert!(response.body.contains("Caneca Sem Preço"));
    assert!(response.body.contains(UNAVAILABLE_PRICE));
}

#[tokio::test]
async fn test_catalog_response_is_cacheable() {
    let app = TestApp::spawn(catalog(1)).await;

    let response = app.get("/").await;

    assert_eq!(
        response.header("cache-control"),
        Some("public, s-maxage=7200, stale-while-revalidate")
    );
    assert!(response.header("x-request-id").is_some());
    assert!(response.header("content-security-policy").is_some());
}

// ============================================================================
// Carousel
// ============================================================================

#[tokio::test]
async fn test_carousel_first_slide_disables_previous() {
    let app = TestApp::spawn(catalog(5)).await;

    let response = app.get("/").await;

    assert!(response.body.contains("aria-disabled=\"true\" data-disabled>&lsaquo;"));
    assert!(response.body.contains("href=\"/?slide=1\" rel=\"next\""));
    assert!(response.body.contains("Camiseta 0"));
    assert!(response.body.contains("Camiseta 2"));
    assert!(!response.body.contains("Camiseta 3"));
}

#[tokio::test]
async fn test_carousel_last_slide_disables_next() {
    let app = TestApp::spawn(catalog(5)).await;

    let response = app.get("/?slide=2").await;

    assert!(response.body.contains("href=\"/?slide=1\" rel=\"prev\""));
    assert!(response.body.contains("aria-disabled=\"true\" data-disabled>&rsaquo;"));
    assert!(response.body.contains("Camiseta 4"));
    assert!(!response.body.contains("Camiseta 1<"));
}

#[tokio::test]
async fn test_carousel_clamps_out_of_range_slide() {
    let app = TestApp::spawn(catalog(5)).await;

    let clamped = app.get("/?slide=99").await;
    let last = app.get("/?slide=2").await;
    assert_eq!(clamped.body.replace(char::is_whitespace, ""), last.body.replace(char::is_whitespace, ""));

    let garbage = app.get("/?slide=abc").await;
    assert_eq!(garbage.status, StatusCode::OK);
    assert!(garbage.body.contains("Camiseta 0"));
}

// ============================================================================
// Product Page
// ============================================================================

#[tokio::test]
async fn test_prerendered_product_is_served_immediately() {
    let app = TestApp::spawn(
        Fixtures::default().with_product(product_json(PRERENDERED_PRODUCT, "Camiseta X", Some(7990))),
    )
    .await;
    assert!(app.state.has_product_page(
        &PRERENDERED_PRODUCT.parse().expect("valid product ID")
    ));

    let response = app.get(&format!("/product/{PRERENDERED_PRODUCT}")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.header("refresh").is_none());
    assert!(response.body.contains("<title>Camiseta X | Ignite Shop</title>"));
    assert!(response.body.contains("R$\u{a0}79,90"));
    assert!(response.body.contains("Comprar agora"));
    assert!(response.body.contains(&format!("value=\"price_{PRERENDERED_PRODUCT}\"")));
    assert!(response.body.contains("name=\"idempotency_key\""));
}

#[tokio::test]
async fn test_product_page_is_not_shared_between_visitors() {
    let app = TestApp::spawn(
        Fixtures::default().with_product(product_json(PRERENDERED_PRODUCT, "Camiseta X", Some(7990))),
    )
    .await;
    let uri = format!("/product/{PRERENDERED_PRODUCT}");

    let first = app.get(&uri).await;
    let second = app.get(&uri).await;

    assert_eq!(first.header("cache-control"), Some("no-store, max-age=0"));
    assert_eq!(second.header("cache-control"), Some("no-store, max-age=0"));
    assert_ne!(idempotency_key(&first.body), idempotency_key(&second.body));
}

#[tokio::test]
async fn test_product_with_hyphenated_id_is_reachable() {
    let app = TestApp::spawn(
        Fixtures::default()
            .with_product(product_json("prod_a", "Camiseta Beyond", Some(7990)))
            .with_product(product_json("camiseta-azul", "Camiseta Azul", Some(8990))),
    )
    .await;

    let home = app.get("/").await;
    assert_eq!(home.status, StatusCode::OK);
    assert!(home.body.contains("Camiseta Beyond"));
    assert!(home.body.contains("href=\"/product/camiseta-azul\""));

    let resolved = app.get_resolved("/product/camiseta-azul").await;
    assert_eq!(resolved.status, StatusCode::OK);
    assert!(resolved.body.contains("Camiseta Azul"));
    assert!(
        app.stripe
            .requests()
            .contains(&"GET /v1/products/camiseta-azul".to_string())
    );
}

#[tokio::test]
async fn test_other_product_renders_loading_then_content() {
    let app = TestApp::spawn(
        Fixtures::default().with_product(product_json("prod_other", "Caneca", Some(4500))),
    )
    .await;

    let first = app.get("/product/prod_other").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.header("refresh"), Some("1"));
    assert!(first.body.contains("loading.."));
    assert!(!first.body.contains("Caneca"));

    let resolved = app.get_resolved("/product/prod_other").await;
    assert_eq!(resolved.status, StatusCode::OK);
    assert!(resolved.body.contains("Caneca"));
    assert!(resolved.body.contains("R$\u{a0}45,00"));
}

#[tokio::test]
async fn test_unknown_product_resolves_to_not_found() {
    let app = TestApp::spawn(Fixtures::default()).await;

    let first = app.get("/product/prod_missing").await;
    assert!(first.body.contains("loading.."));

    let resolved = app.get_resolved("/product/prod_missing").await;
    assert_eq!(resolved.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_product_id_is_not_found() {
    let app = TestApp::spawn(Fixtures::default()).await;

    for uri in ["/product/bad%20id", "/product/prod%2F1", "/product/..%3F"] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{uri}");
    }
    assert!(app.stripe.requests().iter().all(|r| !r.starts_with("GET /v1/products/")));
}

#[tokio::test]
async fn test_unpriced_product_detail_placeholder_disables_buy() {
    let app = TestApp::spawn_with_policy(
        Fixtures::default().with_product(product_json(PRERENDERED_PRODUCT, "Caneca", None)),
        UnpricedPolicy::Placeholder,
    )
    .await;

    let response = app.get(&format!("/product/{PRERENDERED_PRODUCT}")).await;

    assert!(response.body.contains(UNAVAILABLE_PRICE));
    assert!(response.body.contains("<button type=\"submit\" disabled>Comprar agora</button>"));
}

// ============================================================================
// Success Page
// ============================================================================

#[tokio::test]
async fn test_success_without_session_redirects_home() {
    let app = TestApp::spawn(Fixtures::default()).await;
    app.stripe.clear_requests();

    for uri in ["/success", "/success?session_id="] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.header("location"), Some("/"));
    }

    assert!(app.stripe.requests().is_empty());
}

#[tokio::test]
async fn test_success_renders_customer_and_product() {
    let app = TestApp::spawn(Fixtures::default().with_session(
        "cs_test_123",
        session_json("cs_test_123", "Maria", "Camiseta X", "https://img/x.png"),
    ))
    .await;

    let response = app.get("/success?session_id=cs_test_123").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Compra efetuada!"));
    assert!(response.body.contains("<strong>Maria</strong>"));
    assert!(response.body.contains("<strong>Camiseta X</strong>"));
    assert!(response.body.contains("x.png"));
    assert!(response.body.contains("noindex"));
    assert_eq!(response.header("cache-control"), Some("no-store, max-age=0"));
}

#[tokio::test]
async fn test_success_unknown_session_is_not_found() {
    let app = TestApp::spawn(Fixtures::default()).await;

    let response = app.get("/success?session_id=cs_test_missing").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_success_session_without_items_is_not_found() {
    let mut session = session_json("cs_test_empty", "Maria", "Camiseta X", "https://img/x.png");
    session["line_items"]["data"] = serde_json::json!([]);
    let app = TestApp::spawn(Fixtures::default().with_session("cs_test_empty", session)).await;

    let response = app.get("/success?session_id=cs_test_empty").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::spawn(Fixtures::default()).await;

    let response = app.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");
}
