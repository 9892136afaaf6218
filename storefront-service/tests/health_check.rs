mod common;

use common::spawn_server;
use reqwest::Client;

#[tokio::test]
async fn health_check_works() {
    let address = spawn_server().await;
    let client = Client::new();

    let response = client
        .get(&format!("{}/health", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "storefront-service");
}

#[tokio::test]
async fn readiness_check_works() {
    let address = spawn_server().await;
    let client = Client::new();

    let response = client
        .get(&format!("{}/ready", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn metrics_are_exposed() {
    storefront_service::services::metrics::init_metrics();
    let address = spawn_server().await;
    let client = Client::new();

    client
        .get(&format!("{}/health", address))
        .send()
        .await
        .expect("Failed to execute request");

    let response = client
        .get(&format!("{}/metrics", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    let body = response.text().await.expect("Failed to read body");
    assert!(body.contains("http_requests_total"));
}
