//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_STORE` - Shop domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_ACCESS_TOKEN` - Admin API access token (HIGH PRIVILEGE)
//!
//! ## Optional
//! - `DATABASE_URL` - SQLite connection string (default: sqlite:stockpilot.db?mode=rwc)
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3002)
//! - `SHOPIFY_API_VERSION` - Admin API version (default: 2026-01)
//! - `STOCKY_API_KEY` - Stocky API key (enables purchase-order sync)
//! - `STOCKY_STORE_NAME` - Store name sent in the `Store-Name` header
//! - `STOCKY_BASE_URL` - Stocky API base URL (default: https://stocky.shopifyapps.com/api/v2)
//! - `LOOK_BACK_DAYS` - Default report window when the client omits it (default: 30)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use stockpilot_core::ShopDomain;
use thiserror::Error;

// =============================================================================
// Fixed tuning constants
// =============================================================================
//
// Page sizes and budgets are deliberate bounds, not knobs: the order page is
// small because each order drags its line items along, the variant scan cap
// bounds report-assembly memory, and the chunk budgets keep every poll well
// under typical proxy timeouts.

/// Orders fetched per GraphQL page during a scan chunk.
pub const ORDER_PAGE_SIZE: i64 = 25;

/// Variants fetched per GraphQL page during report assembly.
pub const VARIANT_PAGE_SIZE: i64 = 100;

/// Hard cap on total variants fetched for a report.
pub const VARIANT_SCAN_CAP: usize = 5000;

/// Wall-clock budget for one report-scan chunk.
pub const REPORT_CHUNK_BUDGET: Duration = Duration::from_millis(3500);

/// Wall-clock budget for one Stocky full-sync chunk.
pub const SYNC_CHUNK_BUDGET: Duration = Duration::from_secs(10);

/// Purchase orders fetched per Stocky page.
pub const SYNC_PAGE_SIZE: u32 = 100;

/// Delay between order pages within a scan chunk.
pub const SCAN_PAGE_DELAY: Duration = Duration::from_millis(200);

/// Delay between Stocky pages within a sync chunk (upstream rate limits).
pub const SYNC_PAGE_DELAY: Duration = Duration::from_millis(500);

/// Suggested client poll delay returned with non-terminal progress.
pub const POLL_DELAY_MS: u64 = 1000;

/// Abandoned report jobs older than this are deleted before a new job is created.
pub const JOB_RETENTION: Duration = Duration::from_secs(48 * 60 * 60);

/// TTL of the single-flight chunk lease on a report job.
pub const CHUNK_LEASE_TTL: Duration = Duration::from_secs(60);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database connection string.
    pub database_url: String,
    /// IP address to bind the server to.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Shopify Admin API configuration.
    pub shopify: ShopifyConfig,
    /// Stocky configuration (optional - enables purchase-order sync).
    pub stocky: Option<StockyConfig>,
    /// Default report look-back window in days.
    pub default_look_back_days: i64,
}

/// Shopify Admin API configuration.
///
/// Implements `Debug` manually to redact the HIGH PRIVILEGE token.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// Shop domain (e.g., your-store.myshopify.com); also the tenant key.
    pub store: ShopDomain,
    /// Admin API version (e.g., 2026-01).
    pub api_version: String,
    /// Admin API access token (HIGH PRIVILEGE - full store access).
    pub access_token: SecretString,
}

impl std::fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Stocky purchase-order API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct StockyConfig {
    /// Stocky API key.
    pub api_key: SecretString,
    /// Store name sent in the `Store-Name` header.
    pub store_name: String,
    /// API base URL (overridable for tests).
    pub base_url: String,
}

impl std::fmt::Debug for StockyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockyConfig")
            .field("api_key", &"[REDACTED]")
            .field("store_name", &self.store_name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url =
            get_env_or_default("DATABASE_URL", "sqlite:stockpilot.db?mode=rwc");
        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "3002")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;

        let shopify = ShopifyConfig::from_env()?;
        let stocky = StockyConfig::from_env()?;

        let default_look_back_days = get_env_or_default("LOOK_BACK_DAYS", "30")
            .parse::<i64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("LOOK_BACK_DAYS".to_string(), e.to_string())
            })?;

        Ok(Self {
            database_url,
            host,
            port,
            shopify,
            stocky,
            default_look_back_days,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns a reference to the Stocky configuration (if configured).
    #[must_use]
    pub const fn stocky(&self) -> Option<&StockyConfig> {
        self.stocky.as_ref()
    }
}

impl ShopifyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let store_raw = get_required_env("SHOPIFY_STORE")?;
        let store = ShopDomain::parse(&store_raw)
            .map_err(|e| ConfigError::InvalidEnvVar("SHOPIFY_STORE".to_string(), e.to_string()))?;

        Ok(Self {
            store,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", "2026-01"),
            access_token: SecretString::from(get_required_env("SHOPIFY_ACCESS_TOKEN")?),
        })
    }
}

impl StockyConfig {
    /// Load Stocky configuration from environment.
    ///
    /// Returns `None` when neither variable is set (sync intents then answer
    /// with a configuration error). Key and store name must be set together.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let api_key = get_optional_env("STOCKY_API_KEY");
        let store_name = get_optional_env("STOCKY_STORE_NAME");

        match (api_key, store_name) {
            (Some(key), Some(name)) => Ok(Some(Self {
                api_key: SecretString::from(key),
                store_name: name,
                base_url: get_env_or_default(
                    "STOCKY_BASE_URL",
                    "https://stocky.shopifyapps.com/api/v2",
                ),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "STOCKY_*".to_string(),
                "Both STOCKY_API_KEY and STOCKY_STORE_NAME must be set together".to_string(),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingEnvVar("SHOPIFY_STORE".to_string());
        assert_eq!(err.to_string(), "Missing environment variable: SHOPIFY_STORE");
    }

    #[test]
    fn test_env_or_default_falls_back() {
        assert_eq!(
            get_env_or_default("STOCKPILOT_TEST_UNSET_VAR", "fallback"),
            "fallback"
        );
    }
}
