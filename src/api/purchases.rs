use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::services::purchase_service::{self, PurchaseFilter, PurchaseInvoiceInput};

/// GET /api/purchases - List purchase invoices (vendor_id, from, to)
pub async fn list_purchases(
    State(db): State<DatabaseConnection>,
    Query(filter): Query<PurchaseFilter>,
) -> impl IntoResponse {
    match purchase_service::list_purchases(&db, filter).await {
        Ok(invoices) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "count": invoices.len(),
                "invoices": invoices
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_purchase(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match purchase_service::get_purchase(&db, id).await {
        Ok(invoice) => (StatusCode::OK, Json(json!({ "success": true, "invoice": invoice }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/purchases - Record a vendor invoice, adding its quantities to stock
#[utoipa::path(
    post,
    path = "/api/purchases",
    responses(
        (status = 201, description = "Invoice recorded and stock increased"),
        (status = 400, description = "Invalid lines"),
        (status = 404, description = "Vendor or variant not found")
    )
)]
pub async fn create_purchase(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<PurchaseInvoiceInput>,
) -> impl IntoResponse {
    match purchase_service::create_purchase(&db, payload).await {
        Ok(invoice) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "invoice": invoice
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_purchase(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<PurchaseInvoiceInput>,
) -> impl IntoResponse {
    match purchase_service::update_purchase(&db, id, payload).await {
        Ok(invoice) => (StatusCode::OK, Json(json!({ "success": true, "invoice": invoice }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /api/purchases/:id - 409 if the goods were already sold
#[utoipa::path(
    delete,
    path = "/api/purchases/{id}",
    params(("id" = i32, Path, description = "Purchase invoice id")),
    responses(
        (status = 200, description = "Invoice deleted and stock reduced"),
        (status = 409, description = "Stock would go negative")
    )
)]
pub async fn delete_purchase(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match purchase_service::delete_purchase(&db, id).await {
        Ok(deleted) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "id": deleted.id,
                "stock": deleted.stock
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
