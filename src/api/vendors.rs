//! Vendor API handlers using repository pattern

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::domain::{DomainError, VendorInput};
use crate::infrastructure::AppState;

#[utoipa::path(
    get,
    path = "/api/vendors",
    responses((status = 200, description = "All vendors with product counts"))
)]
pub async fn list_vendors(State(state): State<AppState>) -> impl IntoResponse {
    match state.vendor_repo.find_all().await {
        Ok(vendors) => Json(json!({
            "success": true,
            "total": vendors.len(),
            "vendors": vendors
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_vendor(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match state.vendor_repo.find_by_id(id).await {
        Ok(Some(vendor)) => (StatusCode::OK, Json(json!({ "success": true, "vendor": vendor }))).into_response(),
        Ok(None) => DomainError::not_found("Vendor").into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/vendors",
    responses(
        (status = 201, description = "Vendor created"),
        (status = 409, description = "Vendor name already exists")
    )
)]
pub async fn create_vendor(
    State(state): State<AppState>,
    Json(payload): Json<VendorInput>,
) -> impl IntoResponse {
    match state.vendor_repo.create(payload).await {
        Ok(vendor) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "vendor": vendor
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_vendor(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<VendorInput>,
) -> impl IntoResponse {
    match state.vendor_repo.update(id, payload).await {
        Ok(vendor) => (StatusCode::OK, Json(json!({ "success": true, "vendor": vendor }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_vendor(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match state.vendor_repo.delete(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Vendor deleted"
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/vendors/:id/next-code - Suggest a product code from the vendor prefix
pub async fn next_product_code(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match state.vendor_repo.next_product_code(id).await {
        Ok(code) => (StatusCode::OK, Json(json!({ "success": true, "code": code }))).into_response(),
        Err(e) => e.into_response(),
    }
}
