use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::services::purchase_return_service::{self, PurchaseReturnInput};
use crate::services::purchase_service::PurchaseFilter;

pub async fn list_purchase_returns(
    State(db): State<DatabaseConnection>,
    Query(filter): Query<PurchaseFilter>,
) -> impl IntoResponse {
    match purchase_return_service::list_purchase_returns(&db, filter).await {
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

pub async fn get_purchase_return(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match purchase_return_service::get_purchase_return(&db, id).await {
        Ok(document) => (StatusCode::OK, Json(json!({ "success": true, "return": document }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_purchase_return(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<PurchaseReturnInput>,
) -> impl IntoResponse {
    match purchase_return_service::create_purchase_return(&db, payload).await {
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

pub async fn update_purchase_return(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<PurchaseReturnInput>,
) -> impl IntoResponse {
    match purchase_return_service::update_purchase_return(&db, id, payload).await {
        Ok(document) => (StatusCode::OK, Json(json!({ "success": true, "return": document }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_purchase_return(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match purchase_return_service::delete_purchase_return(&db, id).await {
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
