//! Product and variant API handlers using repository pattern

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::domain::{DomainError, ProductFilter, ProductInput};
use crate::infrastructure::AppState;

/// Query parameters for listing products
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListProductsQuery {
    /// Only products of this vendor
    pub vendor_id: Option<i32>,
    /// Filter on the active flag
    pub active: Option<bool>,
    /// Search code or description
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VariantSearchQuery {
    pub q: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

#[utoipa::path(
    get,
    path = "/api/products",
    responses((status = 200, description = "Products with their variants"))
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListProductsQuery>,
) -> impl IntoResponse {
    let filter = ProductFilter {
        vendor_id: params.vendor_id,
        active: params.active,
        query: params.q,
    };

    match state.product_repo.find_all(filter).await {
        Ok(products) => Json(json!({
            "success": true,
            "total": products.len(),
            "products": products
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_product(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match state.product_repo.find_by_id(id).await {
        Ok(Some(product)) => (StatusCode::OK, Json(json!({ "success": true, "product": product }))).into_response(),
        Ok(None) => DomainError::not_found("Product").into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/products",
    responses(
        (status = 201, description = "Product created with its variants"),
        (status = 404, description = "Vendor not found"),
        (status = 409, description = "Product code already exists")
    )
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<ProductInput>,
) -> impl IntoResponse {
    match state.product_repo.create(payload).await {
        Ok(product) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "product": product
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<ProductInput>,
) -> impl IntoResponse {
    match state.product_repo.update(id, payload).await {
        Ok(product) => (StatusCode::OK, Json(json!({ "success": true, "product": product }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// PUT /api/products/:id/active - Activate or retire a product
pub async fn set_product_active(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<SetActiveRequest>,
) -> impl IntoResponse {
    match state.product_repo.set_active(id, payload.is_active).await {
        Ok(product) => (StatusCode::OK, Json(json!({ "success": true, "product": product }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_product(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match state.product_repo.delete(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Product deleted"
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/variants?q= - Variant rows for invoice line entry
pub async fn search_variants(
    State(state): State<AppState>,
    Query(params): Query<VariantSearchQuery>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(25).clamp(1, 200);

    match state.product_repo.search_variants(params.q, limit).await {
        Ok(variants) => Json(json!({
            "success": true,
            "total": variants.len(),
            "variants": variants
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}
