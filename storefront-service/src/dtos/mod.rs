pub mod catalog;
pub mod orders;
pub mod points;
pub mod users;

pub use catalog::{
    CreateCouponRequest, CreateInventoryItemRequest, CreateSupplierRequest,
    UpdateInventoryItemRequest, UpdateSupplierRequest,
};
pub use orders::{
    CreateOrderRequest, DeleteOrderResponse, OrderItemRequest, OrderListParams,
    UpdateOrderRequest, UpdateStatusRequest,
};
pub use points::{PointsRequest, RedeemRequest};
pub use users::{CreateUserRequest, LoginRequest, LoginResponse, UpdateUserRequest};
