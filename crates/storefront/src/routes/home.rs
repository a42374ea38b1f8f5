//! Catalog page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use crate::carousel::Carousel;
use crate::catalog::ProductSummary;
use crate::error::Result;
use crate::filters;
use crate::state::AppState;

/// Carousel position query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CarouselQuery {
    /// Unparsable values are treated as absent.
    #[serde(default, deserialize_with = "lenient_index")]
    pub slide: Option<usize>,
}

fn lenient_index<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    /// Products inside the visible carousel window.
    pub products: Vec<ProductSummary>,
    /// Whether the catalog is empty.
    pub empty: bool,
    /// Slide index behind the "previous" control; `None` renders it disabled.
    pub prev_slide: Option<usize>,
    /// Slide index behind the "next" control; `None` renders it disabled.
    pub next_slide: Option<usize>,
}

/// Display the catalog carousel.
#[instrument(skip(state))]
pub async fn home(
    State(state): State<AppState>,
    Query(query): Query<CarouselQuery>,
) -> Result<impl IntoResponse> {
    let products = state.catalog().await?;
    let carousel = Carousel::new(products.len()).at(query.slide.unwrap_or(0));

    let template = HomeTemplate {
        products: products
            .get(carousel.visible())
            .map(<[ProductSummary]>::to_vec)
            .unwrap_or_default(),
        empty: products.is_empty(),
        prev_slide: carousel.prev_index(),
        next_slide: carousel.next_index(),
    };

    Ok((super::generated_page_headers(&state), template))
}
