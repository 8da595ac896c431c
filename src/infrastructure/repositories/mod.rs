//! Repository implementations using SeaORM

pub mod product_repository;
pub mod vendor_repository;

pub use product_repository::SeaOrmProductRepository;
pub use vendor_repository::SeaOrmVendorRepository;
