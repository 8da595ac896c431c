//! Helpers shared by the document services: line payloads, money rounding,
//! date normalisation and variant lookups.

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::DomainError;
use crate::models::{product, product_variant};

/// A priced line of a purchase or purchase-return document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineInput {
    pub variant_id: i32,
    pub quantity: i32,
    pub unit_price: f64,
}

/// Round to cents
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

pub fn line_total(quantity: i32, unit_price: f64, discount_percent: f64) -> f64 {
    round_money(f64::from(quantity) * unit_price * (1.0 - discount_percent / 100.0))
}

/// Accept `YYYY-MM-DD` (or an RFC 3339 timestamp) and store the calendar date
pub fn normalize_date(raw: Option<&str>) -> Result<String, DomainError> {
    let raw = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw,
        None => return Ok(chrono::Local::now().format("%Y-%m-%d").to_string()),
    };

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.format("%Y-%m-%d").to_string());
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
        .map_err(|_| DomainError::validation(format!("Invalid date '{}'", raw)))
}

/// Optional `from`/`to` filter bound; blank means unbounded
pub fn date_bound(raw: Option<&str>) -> Result<Option<String>, DomainError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => normalize_date(Some(raw)).map(Some),
        None => Ok(None),
    }
}

/// Common checks for priced lines: at least one, positive quantities, sane prices
pub fn validate_lines(lines: &[LineInput]) -> Result<(), DomainError> {
    if lines.is_empty() {
        return Err(DomainError::validation("At least one item is required"));
    }
    for line in lines {
        if line.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "Quantity for variant {} must be positive",
                line.variant_id
            )));
        }
        if !(line.unit_price >= 0.0) {
            return Err(DomainError::validation(format!(
                "Unit price for variant {} must be zero or positive",
                line.variant_id
            )));
        }
    }
    Ok(())
}

/// Load the variants referenced by a document together with their products.
/// Fails with `NotFound` naming the first unknown variant.
pub async fn load_variants<C: ConnectionTrait>(
    conn: &C,
    variant_ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, (product_variant::Model, product::Model)>, DomainError> {
    let mut ids: Vec<i32> = variant_ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    let rows = product_variant::Entity::find()
        .filter(product_variant::Column::Id.is_in(ids.clone()))
        .find_also_related(product::Entity)
        .all(conn)
        .await?;

    let mut found = HashMap::with_capacity(rows.len());
    for (variant, product) in rows {
        if let Some(product) = product {
            found.insert(variant.id, (variant, product));
        }
    }

    if let Some(missing) = ids.iter().find(|id| !found.contains_key(id)) {
        return Err(DomainError::not_found(format!("Variant {}", missing)));
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_applies_percentage_discount() {
        assert_eq!(line_total(3, 10.0, 0.0), 30.0);
        assert_eq!(line_total(2, 19.99, 10.0), 35.98);
    }

    #[test]
    fn normalize_date_accepts_plain_and_rfc3339() {
        assert_eq!(normalize_date(Some("2024-03-05")).unwrap(), "2024-03-05");
        assert_eq!(
            normalize_date(Some("2024-03-05T10:00:00+01:00")).unwrap(),
            "2024-03-05"
        );
        assert!(normalize_date(Some("05/03/2024")).is_err());
        assert_eq!(normalize_date(None).unwrap().len(), 10);
    }

    #[test]
    fn date_bound_pads_short_dates_and_skips_blanks() {
        assert_eq!(date_bound(Some("2024-3-5")).unwrap().as_deref(), Some("2024-03-05"));
        assert_eq!(date_bound(Some("  ")).unwrap(), None);
        assert_eq!(date_bound(None).unwrap(), None);
        assert!(date_bound(Some("March 5th")).is_err());
    }

    #[test]
    fn validate_lines_rejects_empty_and_non_positive_quantities() {
        assert!(validate_lines(&[]).is_err());
        let line = LineInput {
            variant_id: 1,
            quantity: 0,
            unit_price: 1.0,
        };
        assert!(validate_lines(&[line]).is_err());
    }
}
