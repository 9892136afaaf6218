//! Settlement and order lifecycle against the Postgres store.
//!
//! Skipped unless `TEST_DATABASE_URL` points at a reachable database.

mod common;

use axum::http::StatusCode;
use common::{d, dec, id_of, order_body, TestApp};
use serde_json::json;

#[tokio::test]
async fn place_order_earns_points() {
    let Some(app) = TestApp::postgres().await else {
        return;
    };
    let user_id = app.create_user("alice").await;
    let item_id = app.create_item("Kettle", "100.00", 5).await;

    let mut body = order_body(user_id, &[(item_id, 2)]);
    body["totalBill"] = json!("200.00");
    let (status, order) = app.post("/api/orders", body).await;

    assert_eq!(status, StatusCode::CREATED, "{}", order);
    assert_eq!(dec(&order["totalBill"]), d("200"));
    assert_eq!(order["orderStatus"], "Pending");
    let lines = order["orderedItems"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(dec(&lines[0]["unitPrice"]), d("100"));

    let (status, fetched) = app.get(&format!("/api/orders/{}", id_of(&order))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["orderedItems"][0]["quantity"], 2);

    assert_eq!(app.balance(user_id).await, Some(d("20")));
    assert_eq!(app.stock(item_id).await, 3);

    app.cleanup().await;
}

#[tokio::test]
async fn overdrawn_redemption_rolls_back_everything() {
    let Some(app) = TestApp::postgres().await else {
        return;
    };
    let user_id = app.create_user("bob").await;
    let item_id = app.create_item("Kettle", "100.00", 5).await;
    app.add_points(user_id, "10").await;

    let mut body = order_body(user_id, &[(item_id, 2)]);
    body["pointsToRedeem"] = json!("50");
    let (status, error) = app.post("/api/orders", body).await;

    assert_eq!(status, StatusCode::CONFLICT, "{}", error);
    assert_eq!(error["kind"], "insufficient_balance");
    assert_eq!(app.balance(user_id).await, Some(d("10")));
    assert_eq!(app.stock(item_id).await, 5);
    assert_eq!(app.order_count(user_id).await, 0);
    let (_, all) = app.get("/api/orders").await;
    assert!(all.as_array().unwrap().is_empty());

    app.cleanup().await;
}

#[tokio::test]
async fn stock_shortage_rejects_whole_order() {
    let Some(app) = TestApp::postgres().await else {
        return;
    };
    let user_id = app.create_user("carol").await;
    let plenty = app.create_item("Mug", "10.00", 50).await;
    let scarce = app.create_item("Teapot", "40.00", 1).await;

    let body = order_body(user_id, &[(plenty, 3), (scarce, 2)]);
    let (status, error) = app.post("/api/orders", body).await;

    assert_eq!(status, StatusCode::CONFLICT, "{}", error);
    assert_eq!(error["kind"], "insufficient_stock");
    assert_eq!(app.stock(plenty).await, 50);
    assert_eq!(app.stock(scarce).await, 1);
    assert_eq!(app.balance(user_id).await, None);
    assert_eq!(app.order_count(user_id).await, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn only_pending_orders_can_be_deleted() {
    let Some(app) = TestApp::postgres().await else {
        return;
    };
    let user_id = app.create_user("dave").await;
    let item_id = app.create_item("Mug", "10.00", 5).await;

    let (status, order) = app
        .post("/api/orders", order_body(user_id, &[(item_id, 1)]))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", order);
    let order_id = id_of(&order);

    let (status, order) = app
        .patch(
            &format!("/api/orders/{}/status", order_id),
            json!({ "orderStatus": "Processing" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", order);

    let (_, processing) = app
        .get(&format!("/api/orders?customerId={}&status=Processing", user_id))
        .await;
    assert_eq!(processing.as_array().unwrap().len(), 1);

    let (status, error) = app.delete(&format!("/api/orders/{}", order_id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["kind"], "invalid_state_transition");
    assert_eq!(app.order_count(user_id).await, 1);

    app.patch(
        &format!("/api/orders/{}/status", order_id),
        json!({ "orderStatus": "Pending" }),
    )
    .await;
    let (status, body) = app.delete(&format!("/api/orders/{}", order_id)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(app.order_count(user_id).await, 0);

    app.cleanup().await;
}
