//! Sales Service - point-of-sale invoices
//!
//! Selling takes goods out of stock; deleting or editing an invoice puts the
//! old quantities back before the new ones are taken.

use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::DomainError;
use crate::models::return_invoice::{self, Entity as ReturnInvoice};
use crate::models::sales_invoice::{self, Entity as SalesInvoice};
use crate::models::sales_item::{self, Entity as SalesItem};
use crate::models::{product, product_variant};
use crate::services::lines;
use crate::services::purchase_service::DeletedDocument;
use crate::services::stock::{self, StockLedger};

pub const PAYMENT_METHODS: &[&str] = &["cash", "card", "transfer"];

#[derive(Debug, Clone, Deserialize)]
pub struct SalesItemInput {
    pub variant_id: i32,
    pub quantity: i32,
    /// Defaults to the product's selling price
    pub unit_price: Option<f64>,
    /// Percent, defaults to 0
    pub discount: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SalesInvoiceInput {
    pub invoice_date: Option<String>,
    pub customer_name: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<SalesItemInput>,
}

/// Date range filter, both bounds inclusive
#[derive(Debug, Default, Clone, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SalesFilter {
    /// First date (YYYY-MM-DD)
    pub from: Option<String>,
    /// Last date (YYYY-MM-DD)
    pub to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesLine {
    pub id: i32,
    pub variant_id: i32,
    pub product_code: String,
    pub description: String,
    pub color: String,
    pub size: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub discount: f64,
    pub line_total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesInvoiceDetails {
    #[serde(flatten)]
    pub invoice: sales_invoice::Model,
    pub items: Vec<SalesLine>,
    pub returns: Vec<return_invoice::Model>,
}

/// A validated, priced line ready to be written
#[derive(Debug, Clone, PartialEq)]
struct PricedLine {
    variant_id: i32,
    quantity: i32,
    unit_price: f64,
    discount: f64,
    line_total: f64,
}

impl SalesInvoiceInput {
    fn normalized(self) -> Result<Self, DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::validation("At least one item is required"));
        }
        let payment_method = self
            .payment_method
            .as_deref()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "cash".to_string());
        if !PAYMENT_METHODS.contains(&payment_method.as_str()) {
            return Err(DomainError::validation(format!(
                "Unknown payment method '{}'",
                payment_method
            )));
        }

        Ok(Self {
            invoice_date: Some(lines::normalize_date(self.invoice_date.as_deref())?),
            customer_name: self
                .customer_name
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            payment_method: Some(payment_method),
            ..self
        })
    }
}

/// Price one requested line against its product
fn price_line(
    item: &SalesItemInput,
    product: &product::Model,
    allow_inactive: bool,
) -> Result<PricedLine, DomainError> {
    if item.quantity <= 0 {
        return Err(DomainError::validation(format!(
            "Quantity for variant {} must be positive",
            item.variant_id
        )));
    }
    if !product.is_active && !allow_inactive {
        return Err(DomainError::validation(format!(
            "Product {} is not active",
            product.code
        )));
    }

    let unit_price = item.unit_price.unwrap_or(product.selling_price);
    if !(unit_price >= 0.0) {
        return Err(DomainError::validation("Unit price must be zero or positive"));
    }

    let discount = item.discount.unwrap_or(0.0);
    if !(0.0..=100.0).contains(&discount) {
        return Err(DomainError::validation("Discount must be between 0 and 100"));
    }
    if let Some(limit) = product.discount_limit
        && discount > limit
    {
        return Err(DomainError::validation(format!(
            "Discount {}% exceeds the {}% limit of product {}",
            discount, limit, product.code
        )));
    }

    Ok(PricedLine {
        variant_id: item.variant_id,
        quantity: item.quantity,
        unit_price,
        discount,
        line_total: lines::line_total(item.quantity, unit_price, discount),
    })
}

async fn price_lines<C: ConnectionTrait>(
    conn: &C,
    items: &[SalesItemInput],
    previously_sold: &HashSet<i32>,
) -> Result<Vec<PricedLine>, DomainError> {
    let variants = lines::load_variants(conn, items.iter().map(|i| i.variant_id)).await?;

    items
        .iter()
        .map(|item| {
            let (_, product) = variants
                .get(&item.variant_id)
                .ok_or_else(|| DomainError::not_found(format!("Variant {}", item.variant_id)))?;
            price_line(item, product, previously_sold.contains(&item.variant_id))
        })
        .collect()
}

async fn insert_items<C: ConnectionTrait>(
    conn: &C,
    invoice_id: i32,
    priced: &[PricedLine],
) -> Result<f64, DomainError> {
    let mut total = 0.0;
    for line in priced {
        total += line.line_total;
        sales_item::ActiveModel {
            sales_invoice_id: Set(invoice_id),
            variant_id: Set(line.variant_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            discount: Set(line.discount),
            line_total: Set(line.line_total),
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
) -> Result<Vec<sales_item::Model>, DomainError> {
    Ok(SalesItem::find()
        .filter(sales_item::Column::SalesInvoiceId.eq(invoice_id))
        .order_by_asc(sales_item::Column::Id)
        .all(conn)
        .await?)
}

async fn ensure_no_returns<C: ConnectionTrait>(conn: &C, invoice_id: i32) -> Result<(), DomainError> {
    let returns = ReturnInvoice::find()
        .filter(return_invoice::Column::SalesInvoiceId.eq(invoice_id))
        .count(conn)
        .await?;
    if returns > 0 {
        return Err(DomainError::conflict(format!(
            "Sales invoice {} has {} return(s); delete them first",
            invoice_id, returns
        )));
    }
    Ok(())
}

pub async fn list_sales(
    db: &DatabaseConnection,
    filter: SalesFilter,
) -> Result<Vec<sales_invoice::Model>, DomainError> {
    let mut condition = Condition::all();
    if let Some(from) = lines::date_bound(filter.from.as_deref())? {
        condition = condition.add(sales_invoice::Column::InvoiceDate.gte(from));
    }
    if let Some(to) = lines::date_bound(filter.to.as_deref())? {
        condition = condition.add(sales_invoice::Column::InvoiceDate.lte(to));
    }

    Ok(SalesInvoice::find()
        .filter(condition)
        .order_by_desc(sales_invoice::Column::InvoiceDate)
        .order_by_desc(sales_invoice::Column::Id)
        .all(db)
        .await?)
}

pub async fn get_sale(db: &DatabaseConnection, id: i32) -> Result<SalesInvoiceDetails, DomainError> {
    let invoice = SalesInvoice::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Sales invoice"))?;

    let items = items_of(db, id).await?;
    let variant_ids: Vec<i32> = items.iter().map(|i| i.variant_id).collect();
    let variants: HashMap<i32, (product_variant::Model, product::Model)> =
        lines::load_variants(db, variant_ids).await?;

    let items = items
        .into_iter()
        .filter_map(|i| {
            variants.get(&i.variant_id).map(|(v, p)| SalesLine {
                id: i.id,
                variant_id: i.variant_id,
                product_code: p.code.clone(),
                description: p.description.clone(),
                color: v.color.clone(),
                size: v.size.clone(),
                quantity: i.quantity,
                unit_price: i.unit_price,
                discount: i.discount,
                line_total: i.line_total,
            })
        })
        .collect();

    let returns = ReturnInvoice::find()
        .filter(return_invoice::Column::SalesInvoiceId.eq(id))
        .order_by_asc(return_invoice::Column::Id)
        .all(db)
        .await?;

    Ok(SalesInvoiceDetails {
        invoice,
        items,
        returns,
    })
}

/// Ring up a sale and take the goods out of stock
pub async fn create_sale(
    db: &DatabaseConnection,
    input: SalesInvoiceInput,
) -> Result<SalesInvoiceDetails, DomainError> {
    let input = input.normalized()?;
    let now = chrono::Utc::now().to_rfc3339();

    let txn = db.begin().await?;
    let priced = price_lines(&txn, &input.items, &HashSet::new()).await?;

    let invoice = sales_invoice::ActiveModel {
        invoice_date: Set(input.invoice_date.clone().unwrap_or_default()),
        customer_name: Set(input.customer_name.clone()),
        payment_method: Set(input.payment_method.clone().unwrap_or_default()),
        total_amount: Set(0.0),
        notes: Set(input.notes.clone()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let total = insert_items(&txn, invoice.id, &priced).await?;
    let mut active: sales_invoice::ActiveModel = invoice.into();
    active.total_amount = Set(total);
    let invoice = active.update(&txn).await?;

    let mut ledger = StockLedger::new();
    for line in &priced {
        ledger.debit(line.variant_id, line.quantity);
    }
    stock::apply(&txn, &ledger).await?;

    txn.commit().await?;
    tracing::info!(
        "Sales invoice #{} recorded ({} lines, total {:.2})",
        invoice.id,
        priced.len(),
        invoice.total_amount
    );

    get_sale(db, invoice.id).await
}

/// Replace the lines of a sale: old quantities go back on the shelf, new ones leave it
pub async fn update_sale(
    db: &DatabaseConnection,
    id: i32,
    input: SalesInvoiceInput,
) -> Result<SalesInvoiceDetails, DomainError> {
    let input = input.normalized()?;

    let txn = db.begin().await?;
    let existing = SalesInvoice::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::not_found("Sales invoice"))?;
    ensure_no_returns(&txn, id).await?;

    let old_items = items_of(&txn, id).await?;
    let previously_sold: HashSet<i32> = old_items.iter().map(|i| i.variant_id).collect();
    let priced = price_lines(&txn, &input.items, &previously_sold).await?;

    let mut ledger = StockLedger::new();
    for item in &old_items {
        ledger.credit(item.variant_id, item.quantity);
    }
    for line in &priced {
        ledger.debit(line.variant_id, line.quantity);
    }
    stock::apply(&txn, &ledger).await?;

    SalesItem::delete_many()
        .filter(sales_item::Column::SalesInvoiceId.eq(id))
        .exec(&txn)
        .await?;
    let total = insert_items(&txn, id, &priced).await?;

    let mut active: sales_invoice::ActiveModel = existing.into();
    active.invoice_date = Set(input.invoice_date.unwrap_or_default());
    active.customer_name = Set(input.customer_name);
    active.payment_method = Set(input.payment_method.unwrap_or_default());
    active.notes = Set(input.notes);
    active.total_amount = Set(total);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    active.update(&txn).await?;

    txn.commit().await?;
    tracing::info!("Sales invoice #{} updated", id);

    get_sale(db, id).await
}

/// Void a sale and put its goods back into stock
pub async fn delete_sale(db: &DatabaseConnection, id: i32) -> Result<DeletedDocument, DomainError> {
    let txn = db.begin().await?;
    SalesInvoice::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::not_found("Sales invoice"))?;
    ensure_no_returns(&txn, id).await?;

    let mut ledger = StockLedger::new();
    for item in items_of(&txn, id).await? {
        ledger.credit(item.variant_id, item.quantity);
    }
    let levels = stock::apply(&txn, &ledger).await?;

    SalesItem::delete_many()
        .filter(sales_item::Column::SalesInvoiceId.eq(id))
        .exec(&txn)
        .await?;
    SalesInvoice::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!("Sales invoice #{} deleted", id);

    Ok(DeletedDocument { id, stock: levels })
}
