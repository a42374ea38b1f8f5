//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::stripe::StripeError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Page generation failed (possibly shared between requests).
    #[error("Catalog error: {0}")]
    Catalog(Arc<CatalogError>),

    /// Stripe API operation failed.
    #[error("Stripe error: {0}")]
    Stripe(#[from] StripeError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        Self::Catalog(Arc::new(err))
    }
}

impl From<Arc<CatalogError>> for AppError {
    fn from(err: Arc<CatalogError>) -> Self {
        Self::Catalog(err)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Catalog(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            Self::Catalog(_) => StatusCode::BAD_GATEWAY,
            Self::Stripe(err) => stripe_status(err),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Map a Stripe failure on a request the visitor initiated.
///
/// Stripe 4xx responses mean the visitor's input (e.g., a price ID) was
/// rejected; everything else is an upstream failure.
fn stripe_status(err: &StripeError) -> StatusCode {
    match err {
        StripeError::NotFound(_) => StatusCode::NOT_FOUND,
        StripeError::Api { status, .. } if (400..500).contains(status) => StatusCode::BAD_REQUEST,
        StripeError::RateLimited(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        // Don't expose provider details to clients
        let message = match status {
            StatusCode::NOT_FOUND => "Página não encontrada",
            StatusCode::BAD_REQUEST => "Requisição inválida",
            StatusCode::SERVICE_UNAVAILABLE => "Serviço temporariamente indisponível",
            StatusCode::BAD_GATEWAY => "Erro ao comunicar com o provedor de pagamentos",
            _ => "Erro interno do servidor",
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for visitor actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
