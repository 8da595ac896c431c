//! Stock export as CSV

use sea_orm::*;
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::DomainError;
use crate::models::{product, product_variant, vendor};
use crate::services::lines::round_money;

#[derive(Debug, Serialize)]
struct StockRow<'a> {
    vendor: &'a str,
    product_code: &'a str,
    description: &'a str,
    color: &'a str,
    size: &'a str,
    stock: i32,
    buying_price: f64,
    stock_value: f64,
}

/// One line per variant, ordered by product code then variant id
pub async fn stock_csv(db: &DatabaseConnection) -> Result<Vec<u8>, DomainError> {
    let vendors: HashMap<i32, String> = vendor::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|v| (v.id, v.name))
        .collect();

    let products = product::Entity::find()
        .order_by_asc(product::Column::Code)
        .find_with_related(product_variant::Entity)
        .all(db)
        .await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut rows = 0usize;
    for (product, mut variants) in products {
        variants.sort_by_key(|v| v.id);
        let vendor = vendors.get(&product.vendor_id).map(String::as_str).unwrap_or("");
        for variant in &variants {
            writer
                .serialize(StockRow {
                    vendor,
                    product_code: &product.code,
                    description: &product.description,
                    color: &variant.color,
                    size: &variant.size,
                    stock: variant.stock,
                    buying_price: product.buying_price,
                    stock_value: round_money(f64::from(variant.stock) * product.buying_price),
                })
                .map_err(|e| DomainError::Internal(e.to_string()))?;
            rows += 1;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DomainError::Internal(e.to_string()))?;
    tracing::debug!("Exported {} variant rows", rows);
    Ok(bytes)
}
