//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::{ProductRepository, VendorRepository};
use crate::infrastructure::{SeaOrmProductRepository, SeaOrmVendorRepository};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection, used directly by the invoicing services
    db: DatabaseConnection,
    /// Vendor repository
    pub vendor_repo: Arc<dyn VendorRepository>,
    /// Product repository
    pub product_repo: Arc<dyn ProductRepository>,
}

impl AppState {
    /// Create a new AppState with all repositories initialized
    pub fn new(db: DatabaseConnection) -> Self {
        let vendor_repo = Arc::new(SeaOrmVendorRepository::new(db.clone()));
        let product_repo = Arc::new(SeaOrmProductRepository::new(db.clone()));

        Self {
            db,
            vendor_repo,
            product_repo,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

// Implement FromRef to allow extracting DatabaseConnection from AppState
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
