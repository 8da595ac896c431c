//! Stock bookkeeping shared by every invoice and return operation.
//!
//! Documents never touch `product_variants.stock` directly. They record the
//! movement they cause in a [`StockLedger`] and hand it to [`apply`], which
//! runs inside the caller's transaction. Updates reverse the old lines and
//! add the new ones into the same ledger, so only the net change per variant
//! hits the database.

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::DomainError;
use crate::models::product_variant::{self, Entity as Variant};

/// Net stock movement per variant, in ascending variant id order
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StockLedger {
    deltas: BTreeMap<i32, i64>,
}

/// Stock level of a variant after a ledger was applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StockLevel {
    pub variant_id: i32,
    pub stock: i32,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Goods coming in (purchase, customer return)
    pub fn credit(&mut self, variant_id: i32, quantity: i32) {
        *self.deltas.entry(variant_id).or_insert(0) += i64::from(quantity);
    }

    /// Goods going out (sale, return to vendor)
    pub fn debit(&mut self, variant_id: i32, quantity: i32) {
        *self.deltas.entry(variant_id).or_insert(0) -= i64::from(quantity);
    }

    /// The ledger that undoes this one
    pub fn reversed(&self) -> Self {
        Self {
            deltas: self.deltas.iter().map(|(id, d)| (*id, -d)).collect(),
        }
    }

    pub fn delta(&self, variant_id: i32) -> i64 {
        self.deltas.get(&variant_id).copied().unwrap_or(0)
    }

    /// Non-zero movements only
    pub fn movements(&self) -> impl Iterator<Item = (i32, i64)> + '_ {
        self.deltas
            .iter()
            .filter(|(_, delta)| **delta != 0)
            .map(|(id, delta)| (*id, *delta))
    }

    pub fn is_empty(&self) -> bool {
        self.movements().next().is_none()
    }
}

/// Stock a variant would hold after `delta`, or the error that must abort the operation
pub fn next_level(variant_id: i32, stock: i32, delta: i64) -> Result<i32, DomainError> {
    let next = i64::from(stock) + delta;
    if next < 0 {
        return Err(DomainError::InsufficientStock {
            variant_id,
            available: stock,
            requested: i32::try_from(-delta).unwrap_or(i32::MAX),
        });
    }
    i32::try_from(next)
        .map_err(|_| DomainError::validation(format!("Stock overflow for variant {}", variant_id)))
}

/// Apply every movement of the ledger. Must run inside a transaction: the
/// first variant that would go negative aborts with `InsufficientStock` and
/// the caller's rollback discards the movements already written.
pub async fn apply<C: ConnectionTrait>(
    conn: &C,
    ledger: &StockLedger,
) -> Result<Vec<StockLevel>, DomainError> {
    let mut levels = Vec::new();
    let now = chrono::Utc::now().to_rfc3339();

    for (variant_id, delta) in ledger.movements() {
        let variant = Variant::find_by_id(variant_id)
            .one(conn)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Variant {}", variant_id)))?;

        let stock = next_level(variant_id, variant.stock, delta)?;

        // Guarded write: the row only changes if it still holds what we read
        let result = Variant::update_many()
            .col_expr(product_variant::Column::Stock, Expr::value(stock))
            .col_expr(product_variant::Column::UpdatedAt, Expr::value(now.clone()))
            .filter(product_variant::Column::Id.eq(variant_id))
            .filter(product_variant::Column::Stock.eq(variant.stock))
            .exec(conn)
            .await?;

        if result.rows_affected != 1 {
            return Err(DomainError::conflict(format!(
                "Stock of variant {} changed concurrently",
                variant_id
            )));
        }

        tracing::debug!(
            "Variant #{} stock {} -> {} ({:+})",
            variant_id,
            variant.stock,
            stock,
            delta
        );
        levels.push(StockLevel { variant_id, stock });
    }

    Ok(levels)
}
