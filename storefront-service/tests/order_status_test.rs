//! Order queries, status updates and soft delete.

mod common;

use axum::http::StatusCode;
use common::{d, dec, id_of, order_body, TestApp};
use serde_json::json;
use uuid::Uuid;

async fn place(app: &TestApp, user_id: Uuid, item_id: Uuid) -> Uuid {
    let (status, order) = app
        .post("/api/orders", order_body(user_id, &[(item_id, 1)]))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", order);
    id_of(&order)
}

#[tokio::test]
async fn status_moves_freely_between_values() {
    let app = TestApp::new();
    let user_id = app.create_user("alice").await;
    let item_id = app.create_item("Mug", "10.00", 5).await;
    let order_id = place(&app, user_id, item_id).await;
    let uri = format!("/api/orders/{}/status", order_id);

    let (status, order) = app.patch(&uri, json!({ "orderStatus": "Completed" })).await;
    assert_eq!(status, StatusCode::OK, "{}", order);
    assert_eq!(order["orderStatus"], "Completed");

    let (status, order) = app.patch(&uri, json!({ "orderStatus": "Pending" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["orderStatus"], "Pending");

    let (status, _) = app.patch(&uri, json!({ "orderStatus": "Shipped" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn status_update_for_unknown_order_is_not_found() {
    let app = TestApp::new();
    let (status, _) = app
        .patch(
            &format!("/api/orders/{}/status", Uuid::new_v4()),
            json!({ "orderStatus": "Processing" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get(&format!("/api/orders/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_by_customer_and_status() {
    let app = TestApp::new();
    let alice = app.create_user("alice").await;
    let bob = app.create_user("bob").await;
    let item_id = app.create_item("Mug", "10.00", 10).await;

    let first = place(&app, alice, item_id).await;
    let second = place(&app, alice, item_id).await;
    place(&app, bob, item_id).await;

    app.patch(
        &format!("/api/orders/{}/status", first),
        json!({ "orderStatus": "Processing" }),
    )
    .await;

    let (_, all) = app.get("/api/orders").await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, mine) = app.get(&format!("/api/orders/customer/{}", alice)).await;
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 2);
    // newest first
    assert_eq!(id_of(&mine[0]), second);

    let (_, processing) = app
        .get(&format!("/api/orders?customerId={}&status=Processing", alice))
        .await;
    let processing = processing.as_array().unwrap();
    assert_eq!(processing.len(), 1);
    assert_eq!(id_of(&processing[0]), first);
}

#[tokio::test]
async fn pending_order_soft_delete_hides_it_from_listings() {
    let app = TestApp::new();
    let user_id = app.create_user("carol").await;
    let item_id = app.create_item("Mug", "10.00", 5).await;
    let order_id = place(&app, user_id, item_id).await;

    let (status, body) = app.delete(&format!("/api/orders/{}", order_id)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["order"]["deleteStatus"], true);

    assert_eq!(app.order_count(user_id).await, 0);
    let (status, order) = app.get(&format!("/api/orders/{}", order_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["deleteStatus"], true);

    // Deleting hides the order; points and stock stay settled.
    assert_eq!(app.balance(user_id).await, Some(d("1")));
    assert_eq!(app.stock(item_id).await, 4);
}

#[tokio::test]
async fn only_pending_orders_can_be_deleted() {
    let app = TestApp::new();
    let user_id = app.create_user("dave").await;
    let item_id = app.create_item("Mug", "10.00", 5).await;
    let order_id = place(&app, user_id, item_id).await;

    app.patch(
        &format!("/api/orders/{}/status", order_id),
        json!({ "orderStatus": "Processing" }),
    )
    .await;

    let (status, error) = app.delete(&format!("/api/orders/{}", order_id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["kind"], "invalid_state_transition");
    assert_eq!(app.order_count(user_id).await, 1);

    let (status, _) = app.delete(&format!("/api/orders/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_update_edits_totals() {
    let app = TestApp::new();
    let user_id = app.create_user("erin").await;
    let item_id = app.create_item("Mug", "10.00", 5).await;
    let order_id = place(&app, user_id, item_id).await;
    let uri = format!("/api/orders/{}", order_id);

    let (status, order) = app
        .put(&uri, json!({ "discount": "1.00", "totalBill": "9.00", "couponCode": "SPRING" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", order);
    assert_eq!(dec(&order["totalBill"]), d("9"));
    assert_eq!(order["couponCode"], "SPRING");

    let (status, _) = app.put(&uri, json!({ "discount": "-1" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
