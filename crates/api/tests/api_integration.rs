//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::AppState;
use api::catalog::CatalogSeed;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn setup() -> axum::Router {
    let seed: CatalogSeed = serde_json::from_value(json!({
        "warehouses": [
            { "id": 1, "name": "Main" },
            { "id": 2, "name": "Branch" }
        ],
        "items": [
            { "id": 10, "sku": "FLT-001", "name": "Oil filter", "purchase_price": "18" },
            { "id": 11, "sku": "BLT-002", "name": "Timing belt", "purchase_price": "42.50" }
        ]
    }))
    .unwrap();
    let (warehouses, inventory) = seed.into_catalogs().await;

    let state = Arc::new(AppState::in_memory(warehouses, inventory));
    api::create_app(state, get_metrics_handle())
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn receive_stock(app: &axum::Router, item: i64, warehouse: i64, quantity: &str) {
    let (status, _) = send(
        app,
        "POST",
        "/stock/receive",
        Some(json!({
            "item_id": item,
            "warehouse_id": warehouse,
            "quantity": quantity,
            "actor_id": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn create_transfer(app: &axum::Router, quantity: &str) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/transfers",
        Some(json!({
            "from_warehouse_id": 1,
            "to_warehouse_id": 2,
            "reason": "Branch restock",
            "created_by": 1,
            "items": [{ "inventory_item_id": 10, "quantity": quantity }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["data"]["id"].as_str().unwrap().to_string()
}

fn actor(id: i64) -> Option<Value> {
    Some(json!({ "actor_id": id }))
}

#[tokio::test]
async fn test_health_check() {
    let app = setup().await;

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["storage"], "memory");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/plain"));
}

#[tokio::test]
async fn test_transfer_lifecycle() {
    let app = setup().await;
    receive_stock(&app, 10, 1, "50").await;

    let id = create_transfer(&app, "5").await;

    let (status, json) = send(&app, "GET", &format!("/transfers/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["total_items"], 1);
    assert_eq!(json["data"]["total_value"], "90");

    for (step, expected) in [
        ("approve", "approved"),
        ("ship", "in_transit"),
        ("receive", "received"),
        ("complete", "completed"),
    ] {
        let (status, json) = send(&app, "POST", &format!("/transfers/{id}/{step}"), actor(2)).await;
        assert_eq!(status, StatusCode::OK, "{step}: {json}");
        assert_eq!(json["data"]["status"], expected);
    }

    let (_, json) = send(&app, "GET", "/stock/items/10", None).await;
    assert_eq!(json["data"]["aggregate_quantity"], "50");
    assert_eq!(json["data"]["levels"].as_array().unwrap().len(), 2);

    let (_, json) = send(&app, "GET", "/stock/warehouses/2", None).await;
    assert_eq!(json["data"][0]["quantity"], "5");

    let (_, json) = send(&app, "GET", "/transfers/stats", None).await;
    assert_eq!(json["data"]["completed"], 1);
}

#[tokio::test]
async fn test_same_warehouse_is_rejected() {
    let app = setup().await;

    let (status, json) = send(
        &app,
        "POST",
        "/transfers",
        Some(json!({
            "from_warehouse_id": 1,
            "to_warehouse_id": 1,
            "created_by": 1,
            "items": [{ "inventory_item_id": 10, "quantity": "1" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["kind"], "InvalidTransferError");
}

#[tokio::test]
async fn test_empty_items_is_rejected() {
    let app = setup().await;

    let (status, json) = send(
        &app,
        "POST",
        "/transfers",
        Some(json!({
            "from_warehouse_id": 1,
            "to_warehouse_id": 2,
            "created_by": 1,
            "items": []
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "InvalidLineItemError");
}

#[tokio::test]
async fn test_invalid_transition_is_conflict() {
    let app = setup().await;
    let id = create_transfer(&app, "1").await;

    let (status, json) = send(&app, "POST", &format!("/transfers/{id}/receive"), actor(2)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["kind"], "InvalidStateTransition");
}

#[tokio::test]
async fn test_ship_without_stock_reports_shortfall() {
    let app = setup().await;
    receive_stock(&app, 10, 1, "2").await;
    let id = create_transfer(&app, "5").await;

    let (status, json) = send(&app, "POST", &format!("/transfers/{id}/ship"), actor(2)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["kind"], "InsufficientStock");
    assert_eq!(json["error"]["details"]["shortfalls"][0]["available"], "2");

    let (_, json) = send(&app, "GET", &format!("/transfers/{id}"), None).await;
    assert_eq!(json["data"]["status"], "pending");
}

#[tokio::test]
async fn test_cancel_with_reason_and_delete() {
    let app = setup().await;
    let cancelled = create_transfer(&app, "1").await;
    let pending = create_transfer(&app, "1").await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/transfers/{cancelled}/cancel"),
        Some(json!({ "actor_id": 3, "reason": "duplicate" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["close_reason"], "duplicate");

    let (status, json) = send(&app, "DELETE", &format!("/transfers/{cancelled}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["kind"], "InvalidStateTransition");

    let (status, _) = send(&app, "DELETE", &format!("/transfers/{pending}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "GET", &format!("/transfers/{pending}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["kind"], "NotFoundError");
}

#[tokio::test]
async fn test_list_transfers_with_filters() {
    let app = setup().await;
    let first = create_transfer(&app, "1").await;
    create_transfer(&app, "2").await;
    send(&app, "POST", &format!("/transfers/{first}/approve"), actor(2)).await;

    let (status, json) = send(&app, "GET", "/transfers?status=approved", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["items"][0]["id"], first.as_str());

    let (_, json) = send(&app, "GET", "/transfers?from_warehouse_id=1&page=1&limit=1", None).await;
    assert_eq!(json["data"]["total"], 2);
    assert_eq!(json["data"]["total_pages"], 2);
    assert_eq!(json["data"]["has_next"], true);

    let (status, json) = send(&app, "GET", "/transfers?status=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "BadRequest");
}

#[tokio::test]
async fn test_invalid_transfer_id_format() {
    let app = setup().await;

    let (status, json) = send(&app, "GET", "/transfers/not-a-uuid", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_alerts_and_reorders() {
    let app = setup().await;

    let (status, json) = send(
        &app,
        "PUT",
        "/alerts/thresholds/10",
        Some(json!({
            "minimum_stock_level": "10",
            "reorder_point": "15",
            "reorder_quantity": "30"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");

    receive_stock(&app, 10, 1, "5").await;
    receive_stock(&app, 10, 2, "3").await;

    let (status, json) = send(&app, "GET", "/alerts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["item_id"], 10);
    assert_eq!(json["data"][0]["alert_level"], "low_stock");
    assert_eq!(json["data"][0]["stock_deficit"], "-2");

    let (_, json) = send(&app, "GET", "/alerts/reorders", None).await;
    assert_eq!(json["data"][0]["suggested_quantity"], "30");
    assert_eq!(json["data"][0]["estimated_cost"], "540");

    let (_, json) = send(&app, "GET", "/alerts/thresholds/10", None).await;
    assert_eq!(json["data"]["reorder_point"], "15");

    let (status, json) = send(&app, "GET", "/alerts/thresholds/11", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["kind"], "NotFoundError");
}

#[tokio::test]
async fn test_invalid_thresholds_are_rejected() {
    let app = setup().await;

    let (status, json) = send(
        &app,
        "PUT",
        "/alerts/thresholds/10",
        Some(json!({
            "minimum_stock_level": "20",
            "reorder_point": "15",
            "reorder_quantity": "30"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "InvalidThreshold");
}

#[tokio::test]
async fn test_direct_stock_operations_and_movements() {
    let app = setup().await;
    receive_stock(&app, 11, 1, "10").await;

    let (status, json) = send(
        &app,
        "POST",
        "/stock/issue",
        Some(json!({
            "item_id": 11,
            "warehouse_id": 1,
            "quantity": "4",
            "actor_id": 2,
            "reference": "WO-88"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["quantity"], "6");

    let (status, json) = send(
        &app,
        "POST",
        "/stock/issue",
        Some(json!({ "item_id": 11, "warehouse_id": 1, "quantity": "7", "actor_id": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["kind"], "InsufficientStock");

    let (status, json) = send(
        &app,
        "POST",
        "/stock/adjust",
        Some(json!({ "item_id": 11, "warehouse_id": 1, "delta": "-1", "actor_id": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["quantity"], "5");

    let (_, json) = send(&app, "GET", "/stock/movements?item_id=11&reference=WO-88", None).await;
    let movements = json["data"].as_array().unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0]["kind"], "out");

    let (_, json) = send(&app, "GET", "/stock/movements?item_id=11", None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 3);

    let (status, json) = send(
        &app,
        "PUT",
        "/stock/items/11/warehouses/1/location",
        Some(json!({ "location": "B-07" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["location"], "B-07");
    assert_eq!(json["data"]["quantity"], "5");

    let (status, json) = send(
        &app,
        "PUT",
        "/stock/items/11/warehouses/999/location",
        Some(json!({ "location": "Z-99" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["kind"], "NotFoundError");

    let (_, json) = send(&app, "GET", "/stock/warehouses/999", None).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_amounts_past_stored_precision_are_bad_request() {
    let app = setup().await;

    let (status, json) = send(
        &app,
        "POST",
        "/transfers",
        Some(json!({
            "from_warehouse_id": 1,
            "to_warehouse_id": 2,
            "created_by": 1,
            "items": [{
                "inventory_item_id": 10,
                "quantity": "10000000000000000000",
                "unit_price": "10000000000000000000"
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "InvalidLineItemError");

    let (status, json) = send(
        &app,
        "POST",
        "/stock/receive",
        Some(json!({
            "item_id": 10,
            "warehouse_id": 1,
            "quantity": "0.00004",
            "actor_id": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "InvalidAdjustment");

    let (_, json) = send(&app, "GET", "/stock/items/10", None).await;
    assert_eq!(json["data"]["aggregate_quantity"], "0");
}

#[tokio::test]
async fn test_malformed_body_uses_envelope() {
    let app = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/transfers")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["kind"], "BadRequest");
}
