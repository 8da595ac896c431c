use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::services::sales_service::SalesFilter;
use crate::services::statistics_service::{self, TopProductsQuery};

pub async fn vendor_statistics(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    match statistics_service::vendor_statistics(&db).await {
        Ok(vendors) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "vendors": vendors
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/statistics/sales",
    responses((status = 200, description = "Sales totals with a per-day breakdown"))
)]
pub async fn sales_statistics(
    State(db): State<DatabaseConnection>,
    Query(filter): Query<SalesFilter>,
) -> impl IntoResponse {
    match statistics_service::sales_statistics(&db, filter).await {
        Ok(stats) => (StatusCode::OK, Json(json!({ "success": true, "statistics": stats }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn top_products(
    State(db): State<DatabaseConnection>,
    Query(query): Query<TopProductsQuery>,
) -> impl IntoResponse {
    match statistics_service::top_products(&db, query).await {
        Ok(products) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "products": products
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
