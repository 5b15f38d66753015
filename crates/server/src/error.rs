//! Unified error handling for the report server.
//!
//! Only two error classes escape a handler as HTTP errors: invalid client
//! input (400) and missing server configuration (500). Upstream and storage
//! failures inside a report or sync chunk are caught by the handler and
//! reported in the response envelope so the polling client can show them.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::shopify::ShopifyError;
use crate::stocky::StockyError;

/// Application-level error type for the report server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A required piece of server configuration is missing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Shopify Admin API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// Stocky API operation failed.
    #[error("Stocky error: {0}")]
    Stocky(#[from] StockyError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error belongs in the response envelope rather than an
    /// HTTP error status.
    ///
    /// The admin-panel client polls this server in a loop; it renders caught
    /// errors inline and only treats 4xx/5xx as a broken deployment.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Shopify(_) | Self::Stocky(_) | Self::Internal(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Configuration(_) | Self::Database(_) | Self::Internal(_)) {
            tracing::error!(error = %self, "Report request error");
        }

        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Shopify(_) => "Shopify service error".to_string(),
            Self::Stocky(_) => "Stocky service error".to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
