//! PostgreSQL store backend for storefront-service.

use super::repository::{
    insufficient_balance, item_not_found, stock_demand, user_not_found, Repository,
};
use crate::models::{
    Coupon, InventoryItem, InventoryItemChanges, NewCoupon, NewInventoryItem, NewSupplier,
    NewUser, Order, OrderChanges, OrderFilter, OrderLine, OrderStatus, PointsAccount, Settlement,
    Supplier, SupplierChanges, User, UserChanges,
};
use crate::services::metrics::DB_QUERY_DURATION;
use async_trait::async_trait;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, name, username, email, contact_number, role, password_hash, created_at, updated_at";
const ITEM_COLUMNS: &str =
    "id, name, price, description, image_url, in_stock, delete_status, created_at, updated_at";
const COUPON_COLUMNS: &str =
    "id, coupon_code, discounted_amount, active_status, created_at, updated_at";
const SUPPLIER_COLUMNS: &str =
    "id, name, email, contact_number, address, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, total_bill, discount, coupon_code, points_redeemed, \
     address, name, email, contact_number, order_status, delete_status, created_at, updated_at";
const LINE_COLUMNS: &str = "id, order_id, inventory_id, quantity, unit_price";
const POINTS_COLUMNS: &str = "id, user_id, balance, created_at, updated_at";

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, e))
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "storefront-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn user_exists(&self, user_id: Uuid) -> Result<bool, AppError> {
        let found = sqlx::query_scalar::<_, i32>("SELECT 1 FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to look up user"))?;
        Ok(found.is_some())
    }

    async fn load_coupon_items(&self, coupons: &mut [Coupon]) -> Result<(), AppError> {
        let ids: Vec<Uuid> = coupons.iter().map(|c| c.id).collect();
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT coupon_id, inventory_id FROM coupon_items WHERE coupon_id = ANY($1) \
             ORDER BY inventory_id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load coupon items"))?;

        let mut by_coupon: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (coupon_id, inventory_id) in rows {
            by_coupon.entry(coupon_id).or_default().push(inventory_id);
        }
        for coupon in coupons.iter_mut() {
            coupon.allowed_items = by_coupon.remove(&coupon.id).unwrap_or_default();
        }
        Ok(())
    }

    /// Attach lines, their inventory items and the ordering user.
    async fn hydrate_orders(&self, mut orders: Vec<Order>) -> Result<Vec<Order>, AppError> {
        if orders.is_empty() {
            return Ok(orders);
        }

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let lines = sqlx::query_as::<_, OrderLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = ANY($1) ORDER BY position"
        ))
        .bind(&order_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load order lines"))?;

        let item_ids: Vec<Uuid> = lines.iter().map(|l| l.inventory_id).collect();
        let items: HashMap<Uuid, InventoryItem> = self
            .get_items(&item_ids)
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        let user_ids: Vec<Uuid> = orders.iter().map(|o| o.user_id).collect();
        let users: HashMap<Uuid, User> = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(&user_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load order users"))?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

        let mut by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for mut line in lines {
            line.inventory = items.get(&line.inventory_id).cloned();
            by_order.entry(line.order_id).or_default().push(line);
        }
        for order in orders.iter_mut() {
            order.ordered_items = by_order.remove(&order.id).unwrap_or_default();
            order.user = users.get(&order.user_id).cloned();
        }
        Ok(orders)
    }

    async fn hydrate_order(&self, order: Order) -> Result<Order, AppError> {
        let mut hydrated = self.hydrate_orders(vec![order]).await?;
        hydrated
            .pop()
            .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Order vanished while loading")))
    }
}

#[async_trait]
impl Repository for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(username = %input.username))]
    async fn create_user(&self, input: &NewUser) -> Result<User, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, username, email, contact_number, role, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.contact_number)
        .bind(input.role)
        .bind(&input.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Username '{}' is already taken",
                    input.username
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create user: {}", e)),
        })?;

        timer.observe_duration();
        info!(user_id = %user.id, "User created");

        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list users"))
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get user"))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to get user by username"))
    }

    #[instrument(skip(self, changes))]
    async fn update_user(
        &self,
        user_id: Uuid,
        changes: &UserChanges,
    ) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                username = COALESCE($3, username),
                email = COALESCE($4, email),
                contact_number = COALESCE($5, contact_number),
                role = COALESCE($6, role),
                password_hash = COALESCE($7, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&changes.name)
        .bind(&changes.username)
        .bind(&changes.email)
        .bind(&changes.contact_number)
        .bind(changes.role)
        .bind(&changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Username is already taken"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to update user: {}", e)),
        })
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_user"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        sqlx::query(
            "DELETE FROM order_lines WHERE order_id IN (SELECT id FROM orders WHERE user_id = $1)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to delete order lines"))?;

        sqlx::query("DELETE FROM orders WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete orders"))?;

        sqlx::query("DELETE FROM points_accounts WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete points account"))?;

        let user = sqlx::query_as::<_, User>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to delete user"))?;

        if user.is_none() {
            return Ok(None);
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        timer.observe_duration();
        info!(user_id = %user_id, "User and dependent records removed");

        Ok(user)
    }

    // -------------------------------------------------------------------------
    // Inventory
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_item(&self, input: &NewInventoryItem) -> Result<InventoryItem, AppError> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            "INSERT INTO inventory_items (id, name, price, description, image_url, in_stock) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ITEM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(input.price)
        .bind(&input.description)
        .bind(&input.image_url)
        .bind(input.in_stock)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create inventory item"))
    }

    async fn list_items(&self) -> Result<Vec<InventoryItem>, AppError> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE delete_status = FALSE \
             ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list inventory items"))
    }

    async fn get_item(&self, item_id: Uuid) -> Result<Option<InventoryItem>, AppError> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1"
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to get inventory item"))
    }

    async fn get_items(&self, item_ids: &[Uuid]) -> Result<Vec<InventoryItem>, AppError> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ANY($1)"
        ))
        .bind(item_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to get inventory items"))
    }

    #[instrument(skip(self, changes))]
    async fn update_item(
        &self,
        item_id: Uuid,
        changes: &InventoryItemChanges,
    ) -> Result<Option<InventoryItem>, AppError> {
        sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            UPDATE inventory_items SET
                name = COALESCE($2, name),
                price = COALESCE($3, price),
                description = COALESCE($4, description),
                image_url = COALESCE($5, image_url),
                in_stock = COALESCE($6, in_stock),
                delete_status = COALESCE($7, delete_status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item_id)
        .bind(&changes.name)
        .bind(changes.price)
        .bind(&changes.description)
        .bind(&changes.image_url)
        .bind(changes.in_stock)
        .bind(changes.delete_status)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to update inventory item"))
    }

    async fn soft_delete_item(&self, item_id: Uuid) -> Result<Option<InventoryItem>, AppError> {
        self.update_item(
            item_id,
            &InventoryItemChanges {
                delete_status: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Coupons
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(coupon_code = %input.coupon_code))]
    async fn create_coupon(&self, input: &NewCoupon) -> Result<Coupon, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let mut coupon = sqlx::query_as::<_, Coupon>(&format!(
            "INSERT INTO coupons (id, coupon_code, discounted_amount) VALUES ($1, $2, $3) \
             RETURNING {COUPON_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&input.coupon_code)
        .bind(input.discounted_amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Coupon code '{}' already exists",
                    input.coupon_code
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create coupon: {}", e)),
        })?;

        let mut allowed_items = input.allowed_items.clone();
        allowed_items.sort();
        allowed_items.dedup();
        for item_id in &allowed_items {
            sqlx::query("INSERT INTO coupon_items (coupon_id, inventory_id) VALUES ($1, $2)")
                .bind(coupon.id)
                .bind(item_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                        item_not_found(*item_id)
                    }
                    _ => AppError::DatabaseError(anyhow::anyhow!(
                        "Failed to attach coupon item: {}",
                        e
                    )),
                })?;
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        coupon.allowed_items = allowed_items;
        Ok(coupon)
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>, AppError> {
        let mut coupons = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list coupons"))?;

        self.load_coupon_items(&mut coupons).await?;
        Ok(coupons)
    }

    async fn get_coupon(&self, coupon_id: Uuid) -> Result<Option<Coupon>, AppError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1"
        ))
        .bind(coupon_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to get coupon"))?;

        let Some(coupon) = coupon else {
            return Ok(None);
        };
        let mut coupons = [coupon];
        self.load_coupon_items(&mut coupons).await?;
        let [coupon] = coupons;
        Ok(Some(coupon))
    }

    #[instrument(skip(self))]
    async fn deactivate_coupon(&self, coupon_id: Uuid) -> Result<Option<Coupon>, AppError> {
        let updated = sqlx::query_scalar::<_, Uuid>(
            "UPDATE coupons SET active_status = FALSE, updated_at = NOW() WHERE id = $1 RETURNING id",
        )
        .bind(coupon_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to deactivate coupon"))?;

        match updated {
            Some(_) => self.get_coupon(coupon_id).await,
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn delete_coupon(&self, coupon_id: Uuid) -> Result<Option<Coupon>, AppError> {
        let Some(coupon) = self.get_coupon(coupon_id).await? else {
            return Ok(None);
        };

        // coupon_items rows go with the coupon (ON DELETE CASCADE).
        sqlx::query("DELETE FROM coupons WHERE id = $1")
            .bind(coupon_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete coupon"))?;

        Ok(Some(coupon))
    }

    // -------------------------------------------------------------------------
    // Suppliers
    // -------------------------------------------------------------------------

    async fn create_supplier(&self, input: &NewSupplier) -> Result<Supplier, AppError> {
        sqlx::query_as::<_, Supplier>(&format!(
            "INSERT INTO suppliers (id, name, email, contact_number, address) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {SUPPLIER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.contact_number)
        .bind(&input.address)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create supplier"))
    }

    async fn list_suppliers(&self) -> Result<Vec<Supplier>, AppError> {
        sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list suppliers"))
    }

    async fn get_supplier(&self, supplier_id: Uuid) -> Result<Option<Supplier>, AppError> {
        sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1"
        ))
        .bind(supplier_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to get supplier"))
    }

    async fn update_supplier(
        &self,
        supplier_id: Uuid,
        changes: &SupplierChanges,
    ) -> Result<Option<Supplier>, AppError> {
        sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE suppliers SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                contact_number = COALESCE($4, contact_number),
                address = COALESCE($5, address),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(supplier_id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.contact_number)
        .bind(&changes.address)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to update supplier"))
    }

    async fn delete_supplier(&self, supplier_id: Uuid) -> Result<Option<Supplier>, AppError> {
        sqlx::query_as::<_, Supplier>(&format!(
            "DELETE FROM suppliers WHERE id = $1 RETURNING {SUPPLIER_COLUMNS}"
        ))
        .bind(supplier_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to delete supplier"))
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    #[instrument(skip(self, settlement), fields(user_id = %settlement.user_id, line_count = settlement.lines.len()))]
    async fn settle_order(&self, settlement: &Settlement) -> Result<Order, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["settle_order"])
            .start_timer();

        if !self.user_exists(settlement.user_id).await? {
            return Err(user_not_found(settlement.user_id));
        }

        // Any error below drops `tx`, which rolls every statement back.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        if settlement.points_redeemed > Decimal::ZERO {
            let debited = sqlx::query_scalar::<_, Decimal>(
                r#"
                UPDATE points_accounts
                SET balance = balance - $2, updated_at = NOW()
                WHERE user_id = $1 AND balance >= $2
                RETURNING balance
                "#,
            )
            .bind(settlement.user_id)
            .bind(settlement.points_redeemed)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to debit points"))?;

            if debited.is_none() {
                let available = sqlx::query_scalar::<_, Decimal>(
                    "SELECT balance FROM points_accounts WHERE user_id = $1",
                )
                .bind(settlement.user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("Failed to read points balance"))?
                .unwrap_or(Decimal::ZERO);
                return Err(insufficient_balance(available, settlement.points_redeemed));
            }
        }

        // Sorted ids keep row lock order stable across concurrent settlements.
        let demand = stock_demand(&settlement.lines)?;
        for (item_id, quantity) in &demand {
            let remaining = sqlx::query_scalar::<_, i32>(
                r#"
                UPDATE inventory_items
                SET in_stock = in_stock - $2, updated_at = NOW()
                WHERE id = $1 AND delete_status = FALSE AND in_stock >= $2
                RETURNING in_stock
                "#,
            )
            .bind(item_id)
            .bind(quantity)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to decrement stock"))?;

            if remaining.is_none() {
                let current = sqlx::query_as::<_, (i32, bool)>(
                    "SELECT in_stock, delete_status FROM inventory_items WHERE id = $1",
                )
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("Failed to read stock"))?;

                return Err(match current {
                    Some((in_stock, false)) => AppError::InsufficientStock(anyhow::anyhow!(
                        "Item {} has {} in stock, {} requested",
                        item_id,
                        in_stock,
                        quantity
                    )),
                    _ => item_not_found(*item_id),
                });
            }
        }

        let order_id = Uuid::new_v4();
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (id, user_id, total_bill, discount, coupon_code, points_redeemed,
                                address, name, email, contact_number, order_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(settlement.user_id)
        .bind(settlement.total_bill)
        .bind(settlement.discount)
        .bind(&settlement.coupon_code)
        .bind(settlement.points_redeemed)
        .bind(&settlement.address)
        .bind(&settlement.name)
        .bind(&settlement.email)
        .bind(&settlement.contact_number)
        .bind(OrderStatus::Pending)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to insert order"))?;

        for (position, line) in settlement.lines.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_lines (id, order_id, inventory_id, quantity, unit_price, position) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(order_id)
            .bind(line.inventory_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to insert order line"))?;
        }

        sqlx::query(
            r#"
            INSERT INTO points_accounts (id, user_id, balance)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET balance = points_accounts.balance + EXCLUDED.balance, updated_at = NOW()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(settlement.user_id)
        .bind(settlement.points_earned)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to credit earned points"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        timer.observe_duration();
        info!(order_id = %order_id, total_bill = %settlement.total_bill, "Order settled");

        self.hydrate_order(order).await
    }

    #[instrument(skip(self))]
    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_orders"])
            .start_timer();

        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE delete_status = FALSE
              AND ($1::uuid IS NULL OR user_id = $1)
              AND ($2::varchar IS NULL OR order_status = $2)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list orders"))?;

        let orders = self.hydrate_orders(orders).await?;
        timer.observe_duration();
        Ok(orders)
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to get order"))?;

        match order {
            Some(order) => Ok(Some(self.hydrate_order(order).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, changes))]
    async fn update_order(
        &self,
        order_id: Uuid,
        changes: &OrderChanges,
    ) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders SET
                total_bill = COALESCE($2, total_bill),
                discount = COALESCE($3, discount),
                coupon_code = COALESCE($4, coupon_code),
                order_status = COALESCE($5, order_status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(changes.total_bill)
        .bind(changes.discount)
        .bind(&changes.coupon_code)
        .bind(changes.order_status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to update order"))?;

        match order {
            Some(order) => Ok(Some(self.hydrate_order(order).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn soft_delete_order(&self, order_id: Uuid) -> Result<Order, AppError> {
        let deleted = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders SET delete_status = TRUE, updated_at = NOW()
            WHERE id = $1 AND order_status = $2
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(OrderStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to soft delete order"))?;

        if let Some(order) = deleted {
            return self.hydrate_order(order).await;
        }

        match self.get_order(order_id).await? {
            Some(order) => Err(AppError::InvalidStateTransition(anyhow::anyhow!(
                "Order {} is {} and can no longer be deleted",
                order_id,
                order.order_status
            ))),
            None => Err(AppError::NotFound(anyhow::anyhow!(
                "Order {} not found",
                order_id
            ))),
        }
    }

    // -------------------------------------------------------------------------
    // Points
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn credit_points(
        &self,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<PointsAccount, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["credit_points"])
            .start_timer();

        let account = sqlx::query_as::<_, PointsAccount>(&format!(
            r#"
            INSERT INTO points_accounts (id, user_id, balance)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET balance = points_accounts.balance + EXCLUDED.balance, updated_at = NOW()
            RETURNING {POINTS_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                user_not_found(user_id)
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to credit points: {}", e)),
        })?;

        timer.observe_duration();
        Ok(account)
    }

    #[instrument(skip(self))]
    async fn debit_points(
        &self,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<PointsAccount, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["debit_points"])
            .start_timer();

        let account = sqlx::query_as::<_, PointsAccount>(&format!(
            r#"
            UPDATE points_accounts
            SET balance = balance - $2, updated_at = NOW()
            WHERE user_id = $1 AND balance >= $2
            RETURNING {POINTS_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to debit points"))?;

        timer.observe_duration();

        match account {
            Some(account) => Ok(account),
            None if !self.user_exists(user_id).await? => Err(user_not_found(user_id)),
            None => {
                let available = self
                    .get_points(user_id)
                    .await?
                    .map(|a| a.balance)
                    .unwrap_or(Decimal::ZERO);
                Err(insufficient_balance(available, amount))
            }
        }
    }

    async fn get_points(&self, user_id: Uuid) -> Result<Option<PointsAccount>, AppError> {
        sqlx::query_as::<_, PointsAccount>(&format!(
            "SELECT {POINTS_COLUMNS} FROM points_accounts WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to get points account"))
    }

    async fn list_points(&self) -> Result<Vec<PointsAccount>, AppError> {
        let mut accounts = sqlx::query_as::<_, PointsAccount>(&format!(
            "SELECT {POINTS_COLUMNS} FROM points_accounts ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list points accounts"))?;

        let users: HashMap<Uuid, User> = self
            .list_users()
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        for account in accounts.iter_mut() {
            account.user = users.get(&account.user_id).cloned();
        }
        Ok(accounts)
    }
}
