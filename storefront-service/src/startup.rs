use crate::config::{StoreBackend, StorefrontConfig};
use crate::handlers::{self, coupons, inventory, orders, points, suppliers, users};
use crate::services::{Database, MemoryStore, OrderService, OrderSettlement, PointsLedger, Repository};
use axum::{
    middleware::from_fn,
    routing::{get, patch, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: StorefrontConfig,
    pub store: Arc<dyn Repository>,
    pub settlement: OrderSettlement,
    pub orders: OrderService,
    pub points: PointsLedger,
}

impl AppState {
    pub fn new(config: StorefrontConfig, store: Arc<dyn Repository>) -> Self {
        Self {
            settlement: OrderSettlement::new(store.clone()),
            orders: OrderService::new(store.clone()),
            points: PointsLedger::new(store.clone()),
            config,
            store,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Orders
        .route("/orders", post(orders::create_order).get(orders::list_orders))
        .route(
            "/orders/:id",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        )
        .route("/orders/:id/status", patch(orders::update_order_status))
        .route(
            "/orders/customer/:customer_id",
            get(orders::list_customer_orders),
        )
        // Points
        .route("/points/add", post(points::add_points))
        .route("/points/deduct", post(points::deduct_points))
        .route("/points/redeem", post(points::redeem_points))
        .route("/points/balance/:user_id", get(points::get_balance))
        .route("/points/customers", get(points::list_customers))
        // Catalog
        .route(
            "/inventoryItems",
            post(inventory::create_item).get(inventory::list_items),
        )
        .route(
            "/inventoryItems/:id",
            get(inventory::get_item)
                .put(inventory::update_item)
                .delete(inventory::delete_item),
        )
        .route(
            "/coupons",
            post(coupons::create_coupon).get(coupons::list_coupons),
        )
        .route(
            "/coupons/:id",
            get(coupons::get_coupon).delete(coupons::delete_coupon),
        )
        .route("/coupons/:id/apply", post(coupons::apply_coupon))
        .route(
            "/suppliers",
            post(suppliers::create_supplier).get(suppliers::list_suppliers),
        )
        .route(
            "/suppliers/:id",
            get(suppliers::get_supplier)
                .put(suppliers::update_supplier)
                .delete(suppliers::delete_supplier),
        )
        // Users
        .route("/users", post(users::create_user).get(users::list_users))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/login", post(users::login));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api", api)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
}

/// Open the configured store, running migrations for Postgres.
pub async fn connect_store(config: &StorefrontConfig) -> Result<Arc<dyn Repository>, AppError> {
    match config.store {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let db = Database::new(
                config.database.url(),
                config.database.max_connections,
                config.database.min_connections,
            )
            .await?;
            if config.database.run_migrations {
                db.run_migrations().await?;
            }
            Ok(Arc::new(db))
        }
    }
}

pub struct Application {
    http_port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: StorefrontConfig) -> Result<Self, AppError> {
        let store = connect_store(&config).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to open store");
            e
        })?;
        let state = AppState::new(config.clone(), store);
        let app = build_router(state);

        let host: std::net::IpAddr = config.common.host.parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("Invalid host '{}': {}", config.common.host, e))
        })?;
        let addr = SocketAddr::new(host, config.common.port);
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let http_port = listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "storefront-service listening");

        let server = axum::serve(listener, app);

        Ok(Self {
            http_port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
