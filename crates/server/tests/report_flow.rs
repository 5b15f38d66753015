//! End-to-end report flow against mocked Shopify responses.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use stockpilot_server::AppState;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{app, mock_shopify, post_reports, test_config, test_pool};

fn orders_page_one() -> serde_json::Value {
    json!({
        "data": {
            "orders": {
                "edges": [
                    {
                        "node": {
                            "id": "gid://shopify/Order/1",
                            "createdAt": "2026-08-10T10:00:00Z",
                            "lineItems": {
                                "edges": [
                                    {"node": {"quantity": 6, "variant": {"id": "gid://shopify/ProductVariant/11"}}},
                                    {"node": {"quantity": 1, "variant": {"id": "gid://shopify/ProductVariant/22"}}},
                                    {"node": {"quantity": 2, "variant": null}}
                                ]
                            }
                        }
                    }
                ],
                "pageInfo": {"hasNextPage": true, "endCursor": "cursor-1"}
            }
        }
    })
}

fn orders_page_two() -> serde_json::Value {
    json!({
        "data": {
            "orders": {
                "edges": [
                    {
                        "node": {
                            "id": "gid://shopify/Order/2",
                            "createdAt": "2026-08-12T10:00:00Z",
                            "lineItems": {
                                "edges": [
                                    {"node": {"quantity": 4, "variant": {"id": "gid://shopify/ProductVariant/11"}}}
                                ]
                            }
                        }
                    }
                ],
                "pageInfo": {"hasNextPage": false, "endCursor": "cursor-2"}
            }
        }
    })
}

fn variants_page() -> serde_json::Value {
    json!({
        "data": {
            "productVariants": {
                "edges": [
                    {"node": {"id": "gid://shopify/ProductVariant/11", "sku": "FAST-1", "title": "Default", "inventoryQuantity": 3, "product": {"title": "Fast Mover"}}},
                    {"node": {"id": "gid://shopify/ProductVariant/22", "sku": "SLOW-1", "title": "Default", "inventoryQuantity": 40, "product": {"title": "Slow Mover"}}},
                    {"node": {"id": "gid://shopify/ProductVariant/33", "sku": null, "title": "Default", "inventoryQuantity": 9, "product": {"title": "Never Sold"}}}
                ],
                "pageInfo": {"hasNextPage": false, "endCursor": null}
            }
        }
    })
}

async fn mount_happy_shopify(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/graphql.json"))
        .and(body_string_contains("OrdersPage"))
        .and(body_string_contains("\"after\":null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(orders_page_one()))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql.json"))
        .and(body_string_contains("OrdersPage"))
        .and(body_string_contains("cursor-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(orders_page_two()))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql.json"))
        .and(body_string_contains("VariantsPage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(variants_page()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn report_runs_to_completion_and_splits_on_threshold() {
    let server = MockServer::start().await;
    mount_happy_shopify(&server).await;

    let config = test_config();
    let pool = test_pool().await;
    let shopify = mock_shopify(&config, &server.uri());
    let state = AppState::with_clients(config, pool, shopify, None);

    let before = Utc::now();
    let (status, body) = post_reports(
        app(state),
        json!({"intent": "reportStart", "lookBackDays": 30, "thresholdQty": 5}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inputs"]["lookBackDays"], 30);
    assert!(body.get("error").is_none());

    let report = &body["report"];
    assert_eq!(report["status"], "done");
    assert_eq!(report["processedCount"], 2);

    let result = &report["result"];
    assert_eq!(result["thresholdQty"], 5);
    assert_eq!(result["truncated"], false);

    // Window lower bound is now minus the look-back, within a second.
    let window_start: chrono::DateTime<Utc> = result["windowStart"]
        .as_str()
        .expect("windowStart")
        .parse()
        .expect("parse windowStart");
    let expected = before - Duration::days(30);
    assert!((window_start - expected).num_seconds().abs() <= 1);

    // Variant 11 sold 10 across two pages: restock. The others fall below.
    let restock = result["restock"].as_array().expect("restock");
    assert_eq!(restock.len(), 1);
    assert_eq!(restock[0]["variantId"], "gid://shopify/ProductVariant/11");
    assert_eq!(restock[0]["soldQuantity"], 10);
    assert_eq!(restock[0]["firstSoldAt"], "2026-08-10T10:00:00Z");
    assert_eq!(restock[0]["lastSoldAt"], "2026-08-12T10:00:00Z");

    let markdown = result["markdown"].as_array().expect("markdown");
    assert_eq!(markdown.len(), 2);
    assert_eq!(markdown[0]["soldQuantity"], 0);
    assert_eq!(markdown[1]["soldQuantity"], 1);
}

#[tokio::test]
async fn finished_report_replays_without_upstream_calls() {
    let server = MockServer::start().await;
    mount_happy_shopify(&server).await;

    let config = test_config();
    let pool = test_pool().await;
    let shopify = mock_shopify(&config, &server.uri());
    let state = AppState::with_clients(config, pool, shopify, None);

    let (status, body) = post_reports(
        app(state.clone()),
        json!({"intent": "reportStart", "thresholdQty": 5}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["status"], "done");
    let job_id = body["report"]["jobId"].as_str().expect("jobId").to_string();

    let calls_after_start = server.received_requests().await.expect("requests").len();

    let (status, replay) = post_reports(
        app(state),
        json!({"intent": "reportContinue", "jobId": job_id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["report"]["status"], "done");
    assert_eq!(replay["report"]["result"], body["report"]["result"]);

    let calls_after_replay = server.received_requests().await.expect("requests").len();
    assert_eq!(calls_after_replay, calls_after_start);
}

#[tokio::test]
async fn graphql_error_is_sticky_until_new_start() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{"message": "Field 'orders' is broken"}]
        })))
        .mount(&server)
        .await;

    let config = test_config();
    let pool = test_pool().await;
    let shopify = mock_shopify(&config, &server.uri());
    let state = AppState::with_clients(config, pool, shopify, None);

    let (status, body) = post_reports(app(state.clone()), json!({"intent": "reportStart"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["status"], "error");
    let message = body["error"].as_str().expect("error").to_string();
    assert!(message.contains("Field 'orders' is broken"));
    let job_id = body["report"]["jobId"].as_str().expect("jobId").to_string();

    let calls_after_start = server.received_requests().await.expect("requests").len();

    // The stored message replays; nothing new goes upstream.
    let (status, replay) = post_reports(
        app(state),
        json!({"intent": "reportContinue", "jobId": job_id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["report"]["status"], "error");
    assert_eq!(replay["error"].as_str().expect("error"), message);

    let calls_after_replay = server.received_requests().await.expect("requests").len();
    assert_eq!(calls_after_replay, calls_after_start);
}

#[tokio::test]
async fn transport_failure_keeps_job_resumable() {
    let server = MockServer::start().await;
    // The first upstream call dies mid-flight; every later one succeeds.
    Mock::given(method("POST"))
        .and(path("/graphql.json"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_happy_shopify(&server).await;

    let config = test_config();
    let pool = test_pool().await;
    let shopify = mock_shopify(&config, &server.uri());
    let state = AppState::with_clients(config, pool, shopify, None);

    let (status, body) = post_reports(
        app(state.clone()),
        json!({"intent": "reportStart", "thresholdQty": 5}),
    )
    .await;

    // A transport failure is not terminal: the job stays running so the
    // poller can pick it back up.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["status"], "running");
    assert!(body["report"]["pollDelayMs"].as_u64().is_some());
    assert!(body["message"].as_str().is_some());
    assert!(body.get("error").is_none());
    let job_id = body["report"]["jobId"].as_str().expect("jobId").to_string();

    let (status, resumed) = post_reports(
        app(state),
        json!({"intent": "reportContinue", "jobId": job_id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resumed["report"]["status"], "done");
    assert_eq!(resumed["report"]["processedCount"], 2);
}

#[tokio::test]
async fn variant_scan_truncates_at_cap() {
    let server = MockServer::start().await;
    mount_happy_shopify(&server).await;

    let config = test_config();
    let shopify = mock_shopify(&config, &server.uri());

    // The page carries three variants; a cap of two cuts it short.
    let scan = shopify.fetch_all_variants(2).await.expect("scan");
    assert_eq!(scan.items.len(), 2);
    assert!(scan.truncated);

    let full = shopify.fetch_all_variants(5000).await.expect("scan");
    assert_eq!(full.items.len(), 3);
    assert!(!full.truncated);
}

#[tokio::test]
async fn invalid_inputs_are_rejected() {
    let server = MockServer::start().await;
    let config = test_config();
    let pool = test_pool().await;
    let shopify = mock_shopify(&config, &server.uri());
    let state = AppState::with_clients(config, pool, shopify, None);

    let (status, _) = post_reports(
        app(state.clone()),
        json!({"intent": "reportStart", "lookBackDays": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_reports(
        app(state.clone()),
        json!({"intent": "reportStart", "thresholdQty": -1}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_reports(app(state.clone()), json!({"intent": "reportContinue"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_reports(
        app(state),
        json!({"intent": "reportContinue", "jobId": "no-such-job"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
