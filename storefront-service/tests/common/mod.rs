//! Test helpers for storefront-service integration tests.
//!
//! Every test gets its own store. `TestApp::new` is in-memory;
//! `TestApp::postgres` runs against `TEST_DATABASE_URL` in a schema of its own.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Once};
use storefront_service::config::StorefrontConfig;
use storefront_service::services::{Database, MemoryStore};
use storefront_service::startup::{build_router, Application};
use storefront_service::AppState;
use tower::util::ServiceExt;
use uuid::Uuid;

static INIT: Once = Once::new();

// Counter for unique schema names
static SCHEMA_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,storefront_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Generate a unique schema name for test isolation.
fn unique_schema_name() -> String {
    let counter = SCHEMA_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("test_storefront_{}_{}", std::process::id(), counter)
}

#[derive(Clone)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    schema_name: Option<String>,
}

impl TestApp {
    pub fn new() -> Self {
        init_tracing();
        let state = AppState::new(StorefrontConfig::in_memory(), Arc::new(MemoryStore::new()));
        Self {
            router: build_router(state.clone()),
            state,
            schema_name: None,
        }
    }

    /// Postgres-backed app in a fresh schema, or `None` when
    /// `TEST_DATABASE_URL` is not set.
    pub async fn postgres() -> Option<Self> {
        init_tracing();
        let base_url = std::env::var("TEST_DATABASE_URL").ok()?;
        let schema_name = unique_schema_name();

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&base_url)
            .await
            .expect("Failed to connect to test database");
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema_name))
            .execute(&pool)
            .await
            .ok();
        sqlx::query(&format!("CREATE SCHEMA {}", schema_name))
            .execute(&pool)
            .await
            .expect("Failed to create test schema");
        pool.close().await;

        let separator = if base_url.contains('?') { "&" } else { "?" };
        let db_url_with_schema = format!(
            "{}{}options=-c search_path%3D{}",
            base_url, separator, schema_name
        );

        let db = Database::new(&db_url_with_schema, 5, 1)
            .await
            .expect("Failed to create test database");
        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        let state = AppState::new(StorefrontConfig::in_memory(), Arc::new(db));
        Some(Self {
            router: build_router(state.clone()),
            state,
            schema_name: Some(schema_name),
        })
    }

    /// Drop the schema created by [`TestApp::postgres`].
    pub async fn cleanup(&self) {
        let (Some(schema_name), Ok(base_url)) =
            (&self.schema_name, std::env::var("TEST_DATABASE_URL"))
        else {
            return;
        };
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&base_url)
            .await
            .ok();

        if let Some(pool) = pool {
            let _ = sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema_name))
                .execute(&pool)
                .await;
            pool.close().await;
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }

    /// Register a customer and return its id.
    pub async fn create_user(&self, username: &str) -> Uuid {
        let (status, body) = self
            .post(
                "/api/users",
                json!({
                    "name": "Test Customer",
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "contactNumber": "555-0100",
                    "password": "correct-horse"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user: {}", body);
        id_of(&body)
    }

    /// Add an inventory item and return its id.
    pub async fn create_item(&self, name: &str, price: &str, in_stock: i32) -> Uuid {
        let (status, body) = self
            .post(
                "/api/inventoryItems",
                json!({
                    "name": name,
                    "price": price,
                    "description": format!("{} for testing", name),
                    "imageUrl": "",
                    "inStock": in_stock
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create item: {}", body);
        id_of(&body)
    }

    pub async fn add_points(&self, user_id: Uuid, points: &str) -> Value {
        let (status, body) = self
            .post("/api/points/add", json!({ "userId": user_id, "points": points }))
            .await;
        assert_eq!(status, StatusCode::OK, "add points: {}", body);
        body
    }

    /// Current balance, or `None` when the user has no points account.
    pub async fn balance(&self, user_id: Uuid) -> Option<Decimal> {
        let (status, body) = self.get(&format!("/api/points/balance/{}", user_id)).await;
        match status {
            StatusCode::OK => Some(dec(&body["balance"])),
            StatusCode::NOT_FOUND => None,
            other => panic!("unexpected balance status {}: {}", other, body),
        }
    }

    pub async fn stock(&self, item_id: Uuid) -> i64 {
        let (status, body) = self.get(&format!("/api/inventoryItems/{}", item_id)).await;
        assert_eq!(status, StatusCode::OK, "get item: {}", body);
        body["inStock"].as_i64().unwrap()
    }

    pub async fn order_count(&self, user_id: Uuid) -> usize {
        let (status, body) = self.get(&format!("/api/orders/customer/{}", user_id)).await;
        assert_eq!(status, StatusCode::OK, "list orders: {}", body);
        body.as_array().unwrap().len()
    }
}

/// Order body with the shipping fields filled in.
pub fn order_body(user_id: Uuid, items: &[(Uuid, i32)]) -> Value {
    json!({
        "userId": user_id,
        "items": items
            .iter()
            .map(|(id, quantity)| json!({ "inventoryId": id, "quantity": quantity }))
            .collect::<Vec<_>>(),
        "name": "Test Customer",
        "email": "customer@example.com",
        "contactNumber": "555-0100",
        "address": "1 Test Street"
    })
}

pub fn id_of(body: &Value) -> Uuid {
    body["id"].as_str().unwrap().parse().unwrap()
}

/// Decimals travel as JSON strings; accept numbers too.
pub fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        Value::Number(n) => n.to_string().parse().unwrap(),
        other => panic!("not a decimal: {}", other),
    }
}

pub fn d(value: &str) -> Decimal {
    value.parse().unwrap()
}

/// Bind the real HTTP server on an ephemeral port and return its base URL.
pub async fn spawn_server() -> String {
    init_tracing();
    let app = Application::build(StorefrontConfig::in_memory())
        .await
        .expect("Failed to build application");
    let address = format!("http://127.0.0.1:{}", app.http_port());
    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });
    address
}
