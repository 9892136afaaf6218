//! Storefront Service - catalog, order settlement and reward points.

pub mod cart;
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::AppState;
