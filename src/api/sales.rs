use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use crate::services::sales_return_service::{self, SalesReturnInput};
use crate::services::sales_service::{self, SalesFilter, SalesInvoiceInput};

/// Query parameters for listing customer returns
#[derive(Debug, Deserialize)]
pub struct ListReturnsQuery {
    pub sales_invoice_id: Option<i32>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// GET /api/sales - List sales invoices (from, to)
pub async fn list_sales(
    State(db): State<DatabaseConnection>,
    Query(filter): Query<SalesFilter>,
) -> impl IntoResponse {
    match sales_service::list_sales(&db, filter).await {
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

/// GET /api/sales/:id - Invoice with its lines and the returns booked against it
pub async fn get_sale(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match sales_service::get_sale(&db, id).await {
        Ok(invoice) => (StatusCode::OK, Json(json!({ "success": true, "invoice": invoice }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/sales - Ring up a sale
#[utoipa::path(
    post,
    path = "/api/sales",
    responses(
        (status = 201, description = "Sale recorded and stock reduced"),
        (status = 400, description = "Inactive product or discount above limit"),
        (status = 409, description = "Insufficient stock")
    )
)]
pub async fn create_sale(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<SalesInvoiceInput>,
) -> impl IntoResponse {
    match sales_service::create_sale(&db, payload).await {
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

pub async fn update_sale(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<SalesInvoiceInput>,
) -> impl IntoResponse {
    match sales_service::update_sale(&db, id, payload).await {
        Ok(invoice) => (StatusCode::OK, Json(json!({ "success": true, "invoice": invoice }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_sale(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match sales_service::delete_sale(&db, id).await {
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

// --- Customer returns ---

pub async fn list_sales_returns(
    State(db): State<DatabaseConnection>,
    Query(params): Query<ListReturnsQuery>,
) -> impl IntoResponse {
    let filter = SalesFilter {
        from: params.from,
        to: params.to,
    };

    match sales_return_service::list_sales_returns(&db, params.sales_invoice_id, filter).await {
        Ok(returns) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "count": returns.len(),
                "returns": returns
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_sales_return(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match sales_return_service::get_sales_return(&db, id).await {
        Ok(document) => (StatusCode::OK, Json(json!({ "success": true, "return": document }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/sales-returns - Book a customer return against a sales invoice
#[utoipa::path(
    post,
    path = "/api/sales-returns",
    responses(
        (status = 201, description = "Return booked, stock increased"),
        (status = 400, description = "Quantity exceeds what is left on the invoice"),
        (status = 404, description = "Sales invoice not found")
    )
)]
pub async fn create_sales_return(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<SalesReturnInput>,
) -> impl IntoResponse {
    match sales_return_service::create_sales_return(&db, payload).await {
        Ok(document) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "return": document
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_sales_return(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match sales_return_service::delete_sales_return(&db, id).await {
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
