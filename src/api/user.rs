//! Admin-only staff account management

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use crate::api::error::forbidden;
use crate::auth::Claims;
use crate::services::user_service::{self, CreateUserRequest};

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

pub async fn list_users(State(db): State<DatabaseConnection>, claims: Claims) -> impl IntoResponse {
    if !claims.is_admin() {
        return forbidden();
    }
    match user_service::list_users(&db).await {
        Ok(users) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "total": users.len(),
                "users": users
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_user(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<CreateUserRequest>,
) -> impl IntoResponse {
    if !claims.is_admin() {
        return forbidden();
    }
    match user_service::create_user(&db, payload).await {
        Ok(user) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "user": user })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn set_active(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<SetActiveRequest>,
) -> impl IntoResponse {
    if !claims.is_admin() {
        return forbidden();
    }
    match user_service::set_active(&db, id, payload.is_active, &claims.sub).await {
        Ok(user) => (StatusCode::OK, Json(json!({ "success": true, "user": user }))).into_response(),
        Err(e) => e.into_response(),
    }
}
