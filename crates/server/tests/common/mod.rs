//! Shared helpers for integration tests.

// Not every test binary uses every helper.
#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use stockpilot_core::ShopDomain;
use stockpilot_server::config::{AppConfig, ShopifyConfig, StockyConfig};
use stockpilot_server::db::MIGRATOR;
use stockpilot_server::shopify::ShopifyClient;
use stockpilot_server::stocky::{RetryPolicy, StockyClient};
use stockpilot_server::{AppState, routes};
use tower::ServiceExt;

pub const TEST_SHOP: &str = "test-store.myshopify.com";

/// In-memory database with migrations applied.
///
/// A single connection keeps every query on the same in-memory database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect in-memory sqlite");
    MIGRATOR.run(&pool).await.expect("run migrations");
    pool
}

pub fn test_shop() -> ShopDomain {
    ShopDomain::parse(TEST_SHOP).expect("valid shop")
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".parse().expect("host"),
        port: 0,
        shopify: ShopifyConfig {
            store: test_shop(),
            api_version: "2026-01".to_string(),
            access_token: SecretString::from("shpat_test_token"),
        },
        stocky: None,
        default_look_back_days: 30,
    }
}

pub fn stocky_config(base_url: &str) -> StockyConfig {
    StockyConfig {
        api_key: SecretString::from("stocky_test_key"),
        store_name: "Test Store".to_string(),
        base_url: base_url.to_string(),
    }
}

/// Shopify client pointed at a mock server.
pub fn mock_shopify(config: &AppConfig, mock_uri: &str) -> ShopifyClient {
    ShopifyClient::with_endpoint(&config.shopify, format!("{mock_uri}/graphql.json"))
}

/// Stocky client pointed at a mock server, with millisecond backoff.
pub fn mock_stocky(base_url: &str) -> StockyClient {
    StockyClient::with_retry(
        &stocky_config(base_url),
        RetryPolicy {
            max_attempts: 5,
            floor: std::time::Duration::from_millis(1),
            cap: std::time::Duration::from_millis(20),
        },
    )
    .expect("build stocky client")
}

pub fn app(state: AppState) -> Router {
    routes::router(state)
}

/// POST a JSON body to `/reports` and return status plus parsed body.
pub async fn post_reports(app: Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/reports")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");

    let response = app.oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse body")
    };

    (status, value)
}
