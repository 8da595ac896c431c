//! HTTP mapping for domain errors

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::DomainError;

impl DomainError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::Conflict(_) | DomainError::InsufficientStock { .. } => StatusCode::CONFLICT,
            DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DomainError::Database(_) | DomainError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status.as_u16(), self);
        }

        let mut body = json!({
            "success": false,
            "error": self.to_string(),
        });
        if let DomainError::InsufficientStock {
            variant_id,
            available,
            requested,
        } = self
        {
            body["variant_id"] = json!(variant_id);
            body["available"] = json!(available);
            body["requested"] = json!(requested);
        }

        (status, Json(body)).into_response()
    }
}

/// 403 for authenticated users lacking the admin role
pub fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "success": false,
            "error": "Admin role required"
        })),
    )
        .into_response()
}
