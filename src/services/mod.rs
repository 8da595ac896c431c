//! Services Layer
//!
//! Business logic behind the HTTP handlers. Every operation that moves
//! stock runs in one transaction and goes through [`stock::apply`].

pub mod export_service;
pub mod lines;
pub mod purchase_return_service;
pub mod purchase_service;
pub mod sales_return_service;
pub mod sales_service;
pub mod statistics_service;
pub mod stock;
pub mod user_service;
