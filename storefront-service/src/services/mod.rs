pub mod database;
pub mod memory;
pub mod metrics;
pub mod orders;
pub mod password;
pub mod points;
pub mod repository;
pub mod settlement;

pub use database::Database;
pub use memory::MemoryStore;
pub use orders::OrderService;
pub use points::{PointsLedger, RedemptionQuote};
pub use repository::Repository;
pub use settlement::{OrderItem, OrderSettlement, PlaceOrder};
