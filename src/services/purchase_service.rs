//! Purchase Service - vendor invoices that bring goods into stock
//!
//! Every create adds item quantities to variant stock, every delete takes
//! them back out, and an update does both in one transaction.

use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::DomainError;
use crate::models::purchase_invoice::{self, Entity as PurchaseInvoice};
use crate::models::purchase_item::{self, Entity as PurchaseItem};
use crate::models::vendor::{self, Entity as Vendor};
use crate::services::lines::{self, LineInput};
use crate::services::stock::{self, StockLedger, StockLevel};

/// Payload for creating or replacing a purchase invoice
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseInvoiceInput {
    pub vendor_id: i32,
    pub invoice_date: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<LineInput>,
}

/// Filter parameters for listing purchase documents
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PurchaseFilter {
    pub vendor_id: Option<i32>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// One row of a purchase or purchase-return document, enriched for display
#[derive(Debug, Clone, Serialize)]
pub struct DocumentLine {
    pub id: i32,
    pub variant_id: i32,
    pub product_code: String,
    pub description: String,
    pub color: String,
    pub size: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub line_total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseInvoiceDetails {
    #[serde(flatten)]
    pub invoice: purchase_invoice::Model,
    pub vendor_name: String,
    pub items: Vec<DocumentLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseSummary {
    pub id: i32,
    pub vendor_id: i32,
    pub vendor_name: Option<String>,
    pub invoice_date: String,
    pub total_amount: f64,
}

/// Outcome of a delete: the stock levels left behind
#[derive(Debug, Clone, Serialize)]
pub struct DeletedDocument {
    pub id: i32,
    pub stock: Vec<StockLevel>,
}

impl PurchaseInvoiceInput {
    fn normalized(self) -> Result<Self, DomainError> {
        lines::validate_lines(&self.items)?;
        Ok(Self {
            invoice_date: Some(lines::normalize_date(self.invoice_date.as_deref())?),
            ..self
        })
    }
}

/// Vendor must exist and every line must reference one of its products
pub(crate) async fn check_vendor_lines<C: ConnectionTrait>(
    conn: &C,
    vendor_id: i32,
    items: &[LineInput],
) -> Result<vendor::Model, DomainError> {
    let vendor = Vendor::find_by_id(vendor_id)
        .one(conn)
        .await?
        .ok_or_else(|| DomainError::not_found("Vendor"))?;

    let variants = lines::load_variants(conn, items.iter().map(|i| i.variant_id)).await?;
    for item in items {
        if let Some((_, product)) = variants.get(&item.variant_id)
            && product.vendor_id != vendor_id
        {
            return Err(DomainError::validation(format!(
                "Product {} is not supplied by vendor '{}'",
                product.code, vendor.name
            )));
        }
    }

    Ok(vendor)
}

/// Enrich raw `(id, variant_id, quantity, unit_price, line_total)` rows
pub(crate) async fn describe_lines<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<(i32, i32, i32, f64, f64)>,
) -> Result<Vec<DocumentLine>, DomainError> {
    let variants = lines::load_variants(conn, rows.iter().map(|r| r.1)).await?;

    Ok(rows
        .into_iter()
        .filter_map(|(id, variant_id, quantity, unit_price, line_total)| {
            variants.get(&variant_id).map(|(v, p)| DocumentLine {
                id,
                variant_id,
                product_code: p.code.clone(),
                description: p.description.clone(),
                color: v.color.clone(),
                size: v.size.clone(),
                quantity,
                unit_price,
                line_total,
            })
        })
        .collect())
}

async fn insert_items<C: ConnectionTrait>(
    conn: &C,
    invoice_id: i32,
    items: &[LineInput],
) -> Result<f64, DomainError> {
    let mut total = 0.0;
    for item in items {
        let line_total = lines::line_total(item.quantity, item.unit_price, 0.0);
        total += line_total;

        purchase_item::ActiveModel {
            purchase_invoice_id: Set(invoice_id),
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

async fn items_of<C: ConnectionTrait>(
    conn: &C,
    invoice_id: i32,
) -> Result<Vec<purchase_item::Model>, DomainError> {
    Ok(PurchaseItem::find()
        .filter(purchase_item::Column::PurchaseInvoiceId.eq(invoice_id))
        .order_by_asc(purchase_item::Column::Id)
        .all(conn)
        .await?)
}

/// List purchase invoices, newest first
pub async fn list_purchases(
    db: &DatabaseConnection,
    filter: PurchaseFilter,
) -> Result<Vec<PurchaseSummary>, DomainError> {
    let mut condition = Condition::all();
    if let Some(vendor_id) = filter.vendor_id {
        condition = condition.add(purchase_invoice::Column::VendorId.eq(vendor_id));
    }
    if let Some(from) = lines::date_bound(filter.from.as_deref())? {
        condition = condition.add(purchase_invoice::Column::InvoiceDate.gte(from));
    }
    if let Some(to) = lines::date_bound(filter.to.as_deref())? {
        condition = condition.add(purchase_invoice::Column::InvoiceDate.lte(to));
    }

    let rows = PurchaseInvoice::find()
        .filter(condition)
        .order_by_desc(purchase_invoice::Column::InvoiceDate)
        .order_by_desc(purchase_invoice::Column::Id)
        .find_also_related(Vendor)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(invoice, vendor)| PurchaseSummary {
            id: invoice.id,
            vendor_id: invoice.vendor_id,
            vendor_name: vendor.map(|v| v.name),
            invoice_date: invoice.invoice_date,
            total_amount: invoice.total_amount,
        })
        .collect())
}

pub async fn get_purchase(
    db: &DatabaseConnection,
    id: i32,
) -> Result<PurchaseInvoiceDetails, DomainError> {
    let (invoice, vendor) = PurchaseInvoice::find_by_id(id)
        .find_also_related(Vendor)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Purchase invoice"))?;

    let rows = items_of(db, id)
        .await?
        .into_iter()
        .map(|i| (i.id, i.variant_id, i.quantity, i.unit_price, i.line_total))
        .collect();

    Ok(PurchaseInvoiceDetails {
        invoice,
        vendor_name: vendor.map(|v| v.name).unwrap_or_default(),
        items: describe_lines(db, rows).await?,
    })
}

/// Record a purchase invoice and add its quantities to stock
pub async fn create_purchase(
    db: &DatabaseConnection,
    input: PurchaseInvoiceInput,
) -> Result<PurchaseInvoiceDetails, DomainError> {
    let input = input.normalized()?;
    let now = chrono::Utc::now().to_rfc3339();

    let txn = db.begin().await?;
    check_vendor_lines(&txn, input.vendor_id, &input.items).await?;

    let invoice = purchase_invoice::ActiveModel {
        vendor_id: Set(input.vendor_id),
        invoice_date: Set(input.invoice_date.clone().unwrap_or_default()),
        total_amount: Set(0.0),
        notes: Set(input.notes.clone()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let total = insert_items(&txn, invoice.id, &input.items).await?;
    let mut active: purchase_invoice::ActiveModel = invoice.into();
    active.total_amount = Set(total);
    let invoice = active.update(&txn).await?;

    let mut ledger = StockLedger::new();
    for item in &input.items {
        ledger.credit(item.variant_id, item.quantity);
    }
    stock::apply(&txn, &ledger).await?;

    txn.commit().await?;
    tracing::info!(
        "Purchase invoice #{} recorded for vendor #{} ({} items, total {:.2})",
        invoice.id,
        invoice.vendor_id,
        input.items.len(),
        invoice.total_amount
    );

    get_purchase(db, invoice.id).await
}

/// Replace a purchase invoice: old quantities leave stock, new ones enter it
pub async fn update_purchase(
    db: &DatabaseConnection,
    id: i32,
    input: PurchaseInvoiceInput,
) -> Result<PurchaseInvoiceDetails, DomainError> {
    let input = input.normalized()?;

    let txn = db.begin().await?;
    let existing = PurchaseInvoice::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::not_found("Purchase invoice"))?;
    check_vendor_lines(&txn, input.vendor_id, &input.items).await?;

    let old_items = items_of(&txn, id).await?;
    let mut ledger = StockLedger::new();
    for item in &old_items {
        ledger.debit(item.variant_id, item.quantity);
    }
    for item in &input.items {
        ledger.credit(item.variant_id, item.quantity);
    }
    stock::apply(&txn, &ledger).await?;

    PurchaseItem::delete_many()
        .filter(purchase_item::Column::PurchaseInvoiceId.eq(id))
        .exec(&txn)
        .await?;
    let total = insert_items(&txn, id, &input.items).await?;

    let mut active: purchase_invoice::ActiveModel = existing.into();
    active.vendor_id = Set(input.vendor_id);
    active.invoice_date = Set(input.invoice_date.unwrap_or_default());
    active.notes = Set(input.notes);
    active.total_amount = Set(total);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    active.update(&txn).await?;

    txn.commit().await?;
    tracing::info!("Purchase invoice #{} updated", id);

    get_purchase(db, id).await
}

/// Delete a purchase invoice, taking its quantities back out of stock.
/// Rejected as a whole if any variant has already been sold below that amount.
pub async fn delete_purchase(
    db: &DatabaseConnection,
    id: i32,
) -> Result<DeletedDocument, DomainError> {
    let txn = db.begin().await?;
    PurchaseInvoice::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::not_found("Purchase invoice"))?;

    let mut ledger = StockLedger::new();
    for item in items_of(&txn, id).await? {
        ledger.debit(item.variant_id, item.quantity);
    }
    let levels = stock::apply(&txn, &ledger).await?;

    PurchaseItem::delete_many()
        .filter(purchase_item::Column::PurchaseInvoiceId.eq(id))
        .exec(&txn)
        .await?;
    PurchaseInvoice::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!("Purchase invoice #{} deleted", id);

    Ok(DeletedDocument { id, stock: levels })
}

/// Quantity purchased per variant across all invoices of a vendor
pub async fn purchased_quantities<C: ConnectionTrait>(
    conn: &C,
    vendor_id: i32,
) -> Result<HashMap<i32, i64>, DomainError> {
    let rows = PurchaseItem::find()
        .inner_join(PurchaseInvoice)
        .filter(purchase_invoice::Column::VendorId.eq(vendor_id))
        .all(conn)
        .await?;

    let mut totals = HashMap::new();
    for row in rows {
        *totals.entry(row.variant_id).or_insert(0) += i64::from(row.quantity);
    }
    Ok(totals)
}
