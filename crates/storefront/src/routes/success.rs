//! Purchase confirmation route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use ignite_shop_core::CheckoutSessionId;
use serde::Deserialize;
use tracing::instrument;

use crate::catalog::{self, PurchaseSummary};
use crate::error::{AppError, Result};
use crate::filters;
use crate::state::AppState;

/// Query parameters appended by the hosted checkout redirect.
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub session_id: Option<String>,
}

/// Success page template.
#[derive(Template, WebTemplate)]
#[template(path = "success.html")]
pub struct SuccessTemplate {
    pub purchase: PurchaseSummary,
}

/// Display the purchase confirmation.
///
/// Rendered per request; a visit without a session ID goes back to the catalog
/// without contacting Stripe.
#[instrument(skip(state, query))]
pub async fn success(
    State(state): State<AppState>,
    Query(query): Query<SuccessQuery>,
) -> Result<Response> {
    let Some(raw_id) = query.session_id.filter(|id| !id.trim().is_empty()) else {
        return Ok(Redirect::temporary("/").into_response());
    };

    let session_id = CheckoutSessionId::parse(raw_id.trim())
        .map_err(|e| AppError::NotFound(format!("checkout session: {e}")))?;

    let purchase = catalog::load_purchase(state.stripe(), &session_id).await?;
    tracing::info!(session_id = %session_id, product = %purchase.product_name, "Purchase confirmed");

    Ok(SuccessTemplate { purchase }.into_response())
}
