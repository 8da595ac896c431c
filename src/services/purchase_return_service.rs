//! Purchase Return Service - goods sent back to a vendor
//! Mirror image of the purchase service: create removes stock, delete restores it.

use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::DomainError;
use crate::models::purchase_return_invoice::{self, Entity as PurchaseReturnInvoice};
use crate::models::purchase_return_item::{self, Entity as PurchaseReturnItem};
use crate::models::vendor::Entity as Vendor;
use crate::services::lines::{self, LineInput};
use crate::services::purchase_service::{
    self, DeletedDocument, DocumentLine, PurchaseFilter, check_vendor_lines, describe_lines,
};
use crate::services::stock::{self, StockLedger};

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseReturnInput {
    pub vendor_id: i32,
    pub return_date: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<LineInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReturnDetails {
    #[serde(flatten)]
    pub document: purchase_return_invoice::Model,
    pub vendor_name: String,
    pub items: Vec<DocumentLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReturnSummary {
    pub id: i32,
    pub vendor_id: i32,
    pub vendor_name: Option<String>,
    pub return_date: String,
    pub total_amount: f64,
}

impl PurchaseReturnInput {
    fn normalized(self) -> Result<Self, DomainError> {
        lines::validate_lines(&self.items)?;
        Ok(Self {
            return_date: Some(lines::normalize_date(self.return_date.as_deref())?),
            ..self
        })
    }
}

async fn items_of<C: ConnectionTrait>(
    conn: &C,
    document_id: i32,
) -> Result<Vec<purchase_return_item::Model>, DomainError> {
    Ok(PurchaseReturnItem::find()
        .filter(purchase_return_item::Column::PurchaseReturnInvoiceId.eq(document_id))
        .order_by_asc(purchase_return_item::Column::Id)
        .all(conn)
        .await?)
}

async fn insert_items<C: ConnectionTrait>(
    conn: &C,
    document_id: i32,
    items: &[LineInput],
) -> Result<f64, DomainError> {
    let mut total = 0.0;
    for item in items {
        let line_total = lines::line_total(item.quantity, item.unit_price, 0.0);
        total += line_total;

        purchase_return_item::ActiveModel {
            purchase_return_invoice_id: Set(document_id),
            variant_id: Set(item.variant_id),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            line_total: Set(line_total),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }
    Ok(lines::round_money(total))
}

/// A vendor can only take back what it delivered: per variant, everything
/// returned to it (including `items`, excluding document `exclude`) must not
/// exceed what was purchased from it.
async fn check_returnable<C: ConnectionTrait>(
    conn: &C,
    vendor_id: i32,
    items: &[LineInput],
    exclude: Option<i32>,
) -> Result<(), DomainError> {
    let purchased = purchase_service::purchased_quantities(conn, vendor_id).await?;

    let mut condition =
        Condition::all().add(purchase_return_invoice::Column::VendorId.eq(vendor_id));
    if let Some(id) = exclude {
        condition = condition.add(purchase_return_invoice::Column::Id.ne(id));
    }
    let previous = PurchaseReturnItem::find()
        .inner_join(PurchaseReturnInvoice)
        .filter(condition)
        .all(conn)
        .await?;

    let mut returned: HashMap<i32, i64> = HashMap::new();
    for row in previous {
        *returned.entry(row.variant_id).or_insert(0) += i64::from(row.quantity);
    }
    for item in items {
        *returned.entry(item.variant_id).or_insert(0) += i64::from(item.quantity);
    }

    for item in items {
        let bought = purchased.get(&item.variant_id).copied().unwrap_or(0);
        let sent_back = returned.get(&item.variant_id).copied().unwrap_or(0);
        if sent_back > bought {
            return Err(DomainError::validation(format!(
                "Cannot return {} unit(s) of variant {}: only {} purchased from this vendor",
                sent_back, item.variant_id, bought
            )));
        }
    }
    Ok(())
}

pub async fn list_purchase_returns(
    db: &DatabaseConnection,
    filter: PurchaseFilter,
) -> Result<Vec<PurchaseReturnSummary>, DomainError> {
    let mut condition = Condition::all();
    if let Some(vendor_id) = filter.vendor_id {
        condition = condition.add(purchase_return_invoice::Column::VendorId.eq(vendor_id));
    }
    if let Some(from) = filter.from {
        condition = condition.add(purchase_return_invoice::Column::ReturnDate.gte(from));
    }
    if let Some(to) = filter.to {
        condition = condition.add(purchase_return_invoice::Column::ReturnDate.lte(to));
    }

    let rows = PurchaseReturnInvoice::find()
        .filter(condition)
        .order_by_desc(purchase_return_invoice::Column::ReturnDate)
        .order_by_desc(purchase_return_invoice::Column::Id)
        .find_also_related(Vendor)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(doc, vendor)| PurchaseReturnSummary {
            id: doc.id,
            vendor_id: doc.vendor_id,
            vendor_name: vendor.map(|v| v.name),
            return_date: doc.return_date,
            total_amount: doc.total_amount,
        })
        .collect())
}

pub async fn get_purchase_return(
    db: &DatabaseConnection,
    id: i32,
) -> Result<PurchaseReturnDetails, DomainError> {
    let (document, vendor) = PurchaseReturnInvoice::find_by_id(id)
        .find_also_related(Vendor)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Purchase return"))?;

    let rows = items_of(db, id)
        .await?
        .into_iter()
        .map(|i| (i.id, i.variant_id, i.quantity, i.unit_price, i.line_total))
        .collect();

    Ok(PurchaseReturnDetails {
        document,
        vendor_name: vendor.map(|v| v.name).unwrap_or_default(),
        items: describe_lines(db, rows).await?,
    })
}

/// Record goods returned to a vendor and remove them from stock
pub async fn create_purchase_return(
    db: &DatabaseConnection,
    input: PurchaseReturnInput,
) -> Result<PurchaseReturnDetails, DomainError> {
    let input = input.normalized()?;
    let now = chrono::Utc::now().to_rfc3339();

    let txn = db.begin().await?;
    check_vendor_lines(&txn, input.vendor_id, &input.items).await?;
    check_returnable(&txn, input.vendor_id, &input.items, None).await?;

    let document = purchase_return_invoice::ActiveModel {
        vendor_id: Set(input.vendor_id),
        return_date: Set(input.return_date.clone().unwrap_or_default()),
        total_amount: Set(0.0),
        notes: Set(input.notes.clone()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let total = insert_items(&txn, document.id, &input.items).await?;
    let mut active: purchase_return_invoice::ActiveModel = document.into();
    active.total_amount = Set(total);
    let document = active.update(&txn).await?;

    let mut ledger = StockLedger::new();
    for item in &input.items {
        ledger.debit(item.variant_id, item.quantity);
    }
    stock::apply(&txn, &ledger).await?;

    txn.commit().await?;
    tracing::info!(
        "Purchase return #{} recorded for vendor #{} (total {:.2})",
        document.id,
        document.vendor_id,
        document.total_amount
    );

    get_purchase_return(db, document.id).await
}

/// Replace a purchase return: old quantities come back into stock, new ones leave it
pub async fn update_purchase_return(
    db: &DatabaseConnection,
    id: i32,
    input: PurchaseReturnInput,
) -> Result<PurchaseReturnDetails, DomainError> {
    let input = input.normalized()?;

    let txn = db.begin().await?;
    let existing = PurchaseReturnInvoice::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::not_found("Purchase return"))?;
    check_vendor_lines(&txn, input.vendor_id, &input.items).await?;
    check_returnable(&txn, input.vendor_id, &input.items, Some(id)).await?;

    let mut ledger = StockLedger::new();
    for item in items_of(&txn, id).await? {
        ledger.credit(item.variant_id, item.quantity);
    }
    for item in &input.items {
        ledger.debit(item.variant_id, item.quantity);
    }
    stock::apply(&txn, &ledger).await?;

    PurchaseReturnItem::delete_many()
        .filter(purchase_return_item::Column::PurchaseReturnInvoiceId.eq(id))
        .exec(&txn)
        .await?;
    let total = insert_items(&txn, id, &input.items).await?;

    let mut active: purchase_return_invoice::ActiveModel = existing.into();
    active.vendor_id = Set(input.vendor_id);
    active.return_date = Set(input.return_date.unwrap_or_default());
    active.notes = Set(input.notes);
    active.total_amount = Set(total);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    active.update(&txn).await?;

    txn.commit().await?;
    tracing::info!("Purchase return #{} updated", id);

    get_purchase_return(db, id).await
}

/// Delete a purchase return, putting its quantities back into stock
pub async fn delete_purchase_return(
    db: &DatabaseConnection,
    id: i32,
) -> Result<DeletedDocument, DomainError> {
    let txn = db.begin().await?;
    PurchaseReturnInvoice::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::not_found("Purchase return"))?;

    let mut ledger = StockLedger::new();
    for item in items_of(&txn, id).await? {
        ledger.credit(item.variant_id, item.quantity);
    }
    let levels = stock::apply(&txn, &ledger).await?;

    PurchaseReturnItem::delete_many()
        .filter(purchase_return_item::Column::PurchaseReturnInvoiceId.eq(id))
        .exec(&txn)
        .await?;
    PurchaseReturnInvoice::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!("Purchase return #{} deleted", id);

    Ok(DeletedDocument { id, stock: levels })
}
