pub mod auth;
pub mod error;
pub mod export;
pub mod health;
pub mod products;
pub mod purchase_returns;
pub mod purchases;
pub mod sales;
pub mod statistics;
pub mod user;
pub mod vendors;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::auth::require_auth;
use crate::infrastructure::AppState;

pub fn api_router(state: AppState) -> Router {
    // Everything below requires a bearer token
    let protected = Router::new()
        .route("/auth/me", get(auth::get_me))
        // Users (admin)
        .route("/users", get(user::list_users).post(user::create_user))
        .route("/users/:id/active", put(user::set_active))
        // Vendors
        .route(
            "/vendors",
            get(vendors::list_vendors).post(vendors::create_vendor),
        )
        .route(
            "/vendors/:id",
            get(vendors::get_vendor)
                .put(vendors::update_vendor)
                .delete(vendors::delete_vendor),
        )
        .route("/vendors/:id/next-code", get(vendors::next_product_code))
        // Products
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/products/:id/active", put(products::set_product_active))
        .route("/variants", get(products::search_variants))
        // Purchase invoices
        .route(
            "/purchases",
            get(purchases::list_purchases).post(purchases::create_purchase),
        )
        .route(
            "/purchases/:id",
            get(purchases::get_purchase)
                .put(purchases::update_purchase)
                .delete(purchases::delete_purchase),
        )
        // Returns to vendors
        .route(
            "/purchase-returns",
            get(purchase_returns::list_purchase_returns)
                .post(purchase_returns::create_purchase_return),
        )
        .route(
            "/purchase-returns/:id",
            get(purchase_returns::get_purchase_return)
                .put(purchase_returns::update_purchase_return)
                .delete(purchase_returns::delete_purchase_return),
        )
        // Sales
        .route("/sales", get(sales::list_sales).post(sales::create_sale))
        .route(
            "/sales/:id",
            get(sales::get_sale)
                .put(sales::update_sale)
                .delete(sales::delete_sale),
        )
        .route(
            "/sales-returns",
            get(sales::list_sales_returns).post(sales::create_sales_return),
        )
        .route(
            "/sales-returns/:id",
            get(sales::get_sales_return).delete(sales::delete_sales_return),
        )
        // Statistics
        .route("/statistics/vendors", get(statistics::vendor_statistics))
        .route("/statistics/sales", get(statistics::sales_statistics))
        .route("/statistics/top-products", get(statistics::top_products))
        // Export
        .route("/export/stock.csv", get(export::export_stock))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/login", post(auth::login))
        .merge(protected)
        .with_state(state)
}
