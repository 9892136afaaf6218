pub mod coupons;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod points;
pub mod suppliers;
pub mod users;

pub use health::{health_check, metrics_handler, readiness_check};
