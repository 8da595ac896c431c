use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::auth::Claims;
use crate::domain::DomainError;
use crate::services::user_service::{self, LoginRequest};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    responses(
        (status = 200, description = "Bearer token issued"),
        (status = 401, description = "Invalid credentials or disabled account")
    )
)]
pub async fn login(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    tracing::info!("Login attempt for user: {}", payload.username);

    match user_service::login(&db, payload).await {
        Ok(res) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "token": res.token,
                "user": res.user
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_me(State(db): State<DatabaseConnection>, claims: Claims) -> impl IntoResponse {
    match user_service::find_by_username(&db, &claims.sub).await {
        Ok(Some(user)) => (StatusCode::OK, Json(json!({ "success": true, "user": user }))).into_response(),
        Ok(None) => DomainError::not_found("User").into_response(),
        Err(e) => e.into_response(),
    }
}
