//! Shared application state.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::shopify::ShopifyClient;
use crate::stocky::StockyClient;

/// Application state shared across request handlers.
///
/// Cheap to clone; all state lives behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: SqlitePool,
    shopify: ShopifyClient,
    stocky: Option<StockyClient>,
}

impl AppState {
    /// Build application state from configuration and a connected pool.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the Stocky client fails to build.
    pub fn new(config: AppConfig, pool: SqlitePool) -> Result<Self, AppError> {
        let shopify = ShopifyClient::new(&config.shopify);
        let stocky = config
            .stocky
            .as_ref()
            .map(StockyClient::new)
            .transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                shopify,
                stocky,
            }),
        })
    }

    /// Build state with pre-constructed clients.
    ///
    /// Used by tests to point the clients at mock servers.
    #[must_use]
    pub fn with_clients(
        config: AppConfig,
        pool: SqlitePool,
        shopify: ShopifyClient,
        stocky: Option<StockyClient>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                shopify,
                stocky,
            }),
        }
    }

    /// Application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Shopify Admin API client.
    #[must_use]
    pub fn shopify(&self) -> &ShopifyClient {
        &self.inner.shopify
    }

    /// Stocky client, if the API key is configured.
    #[must_use]
    pub fn stocky(&self) -> Option<&StockyClient> {
        self.inner.stocky.as_ref()
    }
}
