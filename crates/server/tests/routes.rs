//! Route-level status codes and health checks.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use stockpilot_server::AppState;
use tower::ServiceExt;
use wiremock::MockServer;

use common::{app, mock_shopify, post_reports, test_config, test_pool};

async fn test_state(server: &MockServer) -> AppState {
    let config = test_config();
    let pool = test_pool().await;
    let shopify = mock_shopify(&config, &server.uri());
    AppState::with_clients(config, pool, shopify, None)
}

#[tokio::test]
async fn health_endpoints_respond() {
    let server = MockServer::start().await;
    let state = test_state(&server).await;

    let response = app(state.clone())
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("send");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(state)
        .oneshot(
            Request::builder()
                .uri("/health/ready")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("send");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_and_unknown_intents_are_bad_requests() {
    let server = MockServer::start().await;
    let state = test_state(&server).await;

    let (status, body) = post_reports(app(state.clone()), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]
            .as_str()
            .expect("error")
            .contains("Missing intent")
    );

    let (status, body) = post_reports(app(state), json!({"intent": "reportRestart"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]
            .as_str()
            .expect("error")
            .contains("Unknown intent")
    );
}

#[tokio::test]
async fn sync_without_stocky_config_is_a_server_error() {
    let server = MockServer::start().await;
    let state = test_state(&server).await;

    let (status, _) = post_reports(app(state.clone()), json!({"intent": "stockyFullSync"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = post_reports(app(state), json!({"intent": "stockyQuickSync"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unknown_sync_mode_is_a_bad_request() {
    let server = MockServer::start().await;
    let state = test_state(&server).await;

    // Mode validation wins even when Stocky is not configured.
    let (status, body) = post_reports(
        app(state),
        json!({"intent": "stockyFullSync", "mode": "weird"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]
            .as_str()
            .expect("error")
            .contains("mode must be start or continue")
    );
}

#[tokio::test]
async fn non_integer_inputs_are_bad_requests() {
    let server = MockServer::start().await;
    let state = test_state(&server).await;

    let (status, _) = post_reports(
        app(state),
        json!({"intent": "reportStart", "lookBackDays": "thirty"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
