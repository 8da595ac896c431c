use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;

use crate::services::export_service;

/// GET /api/export/stock.csv - Current stock per variant
pub async fn export_stock(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    let csv = match export_service::stock_csv(&db).await {
        Ok(csv) => csv,
        Err(e) => return e.into_response(),
    };

    let filename = format!("stock_{}.csv", chrono::Utc::now().format("%Y-%m-%d"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    )
        .into_response()
}
