//! Sales Return Service - customer returns booked against a sales invoice
//!
//! A return puts goods back into stock and shrinks the originating sales
//! lines and invoice total. Returns are not edited; delete and book again.

use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::DomainError;
use crate::models::return_invoice::{self, Entity as ReturnInvoice};
use crate::models::return_item::{self, Entity as ReturnItem};
use crate::models::sales_invoice::{self, Entity as SalesInvoice};
use crate::models::sales_item::{self, Entity as SalesItem};
use crate::services::lines;
use crate::services::purchase_service::{DeletedDocument, DocumentLine, describe_lines};
use crate::services::sales_service::SalesFilter;
use crate::services::stock::{self, StockLedger};

#[derive(Debug, Clone, Deserialize)]
pub struct ReturnLineInput {
    pub sales_item_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SalesReturnInput {
    pub sales_invoice_id: i32,
    pub return_date: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<ReturnLineInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesReturnDetails {
    #[serde(flatten)]
    pub document: return_invoice::Model,
    pub items: Vec<DocumentLine>,
}

impl SalesReturnInput {
    fn normalized(self) -> Result<Self, DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::validation("At least one item is required"));
        }
        let mut seen = HashSet::new();
        for item in &self.items {
            if item.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "Returned quantity for sales item {} must be positive",
                    item.sales_item_id
                )));
            }
            if !seen.insert(item.sales_item_id) {
                return Err(DomainError::validation(format!(
                    "Sales item {} listed twice",
                    item.sales_item_id
                )));
            }
        }
        Ok(Self {
            return_date: Some(lines::normalize_date(self.return_date.as_deref())?),
            ..self
        })
    }
}

/// Refund for `quantity` units of a sales line, at the price actually charged
fn refund(item: &sales_item::Model, quantity: i32) -> f64 {
    lines::line_total(quantity, item.unit_price, item.discount)
}

/// Sales line after `quantity` units changed hands (negative = returned)
fn adjusted_line(item: sales_item::Model, quantity: i32) -> sales_item::ActiveModel {
    let remaining = item.quantity + quantity;
    let line_total = lines::line_total(remaining, item.unit_price, item.discount);
    let mut active: sales_item::ActiveModel = item.into();
    active.quantity = Set(remaining);
    active.line_total = Set(line_total);
    active
}

async fn adjust_invoice_total<C: ConnectionTrait>(
    conn: &C,
    invoice: sales_invoice::Model,
    amount: f64,
) -> Result<(), DomainError> {
    let total = lines::round_money(invoice.total_amount + amount);
    if total < 0.0 {
        return Err(DomainError::conflict(format!(
            "Refund of {:.2} exceeds the total of sales invoice #{}",
            -amount, invoice.id
        )));
    }
    let mut active: sales_invoice::ActiveModel = invoice.into();
    active.total_amount = Set(total);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    active.update(conn).await?;
    Ok(())
}

async fn items_of<C: ConnectionTrait>(
    conn: &C,
    return_id: i32,
) -> Result<Vec<return_item::Model>, DomainError> {
    Ok(ReturnItem::find()
        .filter(return_item::Column::ReturnInvoiceId.eq(return_id))
        .order_by_asc(return_item::Column::Id)
        .all(conn)
        .await?)
}

pub async fn list_sales_returns(
    db: &DatabaseConnection,
    sales_invoice_id: Option<i32>,
    filter: SalesFilter,
) -> Result<Vec<return_invoice::Model>, DomainError> {
    let mut condition = Condition::all();
    if let Some(id) = sales_invoice_id {
        condition = condition.add(return_invoice::Column::SalesInvoiceId.eq(id));
    }
    if let Some(from) = lines::date_bound(filter.from.as_deref())? {
        condition = condition.add(return_invoice::Column::ReturnDate.gte(from));
    }
    if let Some(to) = lines::date_bound(filter.to.as_deref())? {
        condition = condition.add(return_invoice::Column::ReturnDate.lte(to));
    }

    Ok(ReturnInvoice::find()
        .filter(condition)
        .order_by_desc(return_invoice::Column::ReturnDate)
        .order_by_desc(return_invoice::Column::Id)
        .all(db)
        .await?)
}

pub async fn get_sales_return(
    db: &DatabaseConnection,
    id: i32,
) -> Result<SalesReturnDetails, DomainError> {
    let document = ReturnInvoice::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Sales return"))?;

    let rows = items_of(db, id)
        .await?
        .into_iter()
        .map(|i| (i.id, i.variant_id, i.quantity, i.unit_price, i.line_total))
        .collect();

    Ok(SalesReturnDetails {
        document,
        items: describe_lines(db, rows).await?,
    })
}

/// Book a customer return: goods go back into stock, the sale shrinks
pub async fn create_sales_return(
    db: &DatabaseConnection,
    input: SalesReturnInput,
) -> Result<SalesReturnDetails, DomainError> {
    let input = input.normalized()?;
    let now = chrono::Utc::now().to_rfc3339();

    let txn = db.begin().await?;
    let invoice = SalesInvoice::find_by_id(input.sales_invoice_id)
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::not_found("Sales invoice"))?;

    let sold: HashMap<i32, sales_item::Model> = SalesItem::find()
        .filter(sales_item::Column::SalesInvoiceId.eq(invoice.id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    let document = return_invoice::ActiveModel {
        sales_invoice_id: Set(invoice.id),
        return_date: Set(input.return_date.clone().unwrap_or_default()),
        total_amount: Set(0.0),
        notes: Set(input.notes.clone()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut ledger = StockLedger::new();
    let mut total = 0.0;
    for line in &input.items {
        let item = sold.get(&line.sales_item_id).cloned().ok_or_else(|| {
            DomainError::validation(format!(
                "Sales item {} does not belong to invoice #{}",
                line.sales_item_id, invoice.id
            ))
        })?;
        if line.quantity > item.quantity {
            return Err(DomainError::validation(format!(
                "Cannot return {} unit(s) of sales item {}: only {} left on the invoice",
                line.quantity, item.id, item.quantity
            )));
        }

        let amount = refund(&item, line.quantity);
        total += amount;
        return_item::ActiveModel {
            return_invoice_id: Set(document.id),
            sales_item_id: Set(item.id),
            variant_id: Set(item.variant_id),
            quantity: Set(line.quantity),
            unit_price: Set(lines::round_money(item.effective_unit_price())),
            line_total: Set(amount),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        ledger.credit(item.variant_id, line.quantity);
        adjusted_line(item, -line.quantity).update(&txn).await?;
    }

    let total = lines::round_money(total);
    let mut active: return_invoice::ActiveModel = document.into();
    active.total_amount = Set(total);
    let document = active.update(&txn).await?;

    adjust_invoice_total(&txn, invoice, -total).await?;
    stock::apply(&txn, &ledger).await?;

    txn.commit().await?;
    tracing::info!(
        "Sales return #{} booked against invoice #{} (refund {:.2})",
        document.id,
        document.sales_invoice_id,
        document.total_amount
    );

    get_sales_return(db, document.id).await
}

/// Undo a customer return: the goods leave stock again and the sale is restored
pub async fn delete_sales_return(
    db: &DatabaseConnection,
    id: i32,
) -> Result<DeletedDocument, DomainError> {
    let txn = db.begin().await?;
    let document = ReturnInvoice::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::not_found("Sales return"))?;

    let returned = items_of(&txn, id).await?;
    let mut booked = StockLedger::new();
    for line in &returned {
        booked.credit(line.variant_id, line.quantity);

        let item = SalesItem::find_by_id(line.sales_item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Sales item {}", line.sales_item_id)))?;
        adjusted_line(item, line.quantity).update(&txn).await?;
    }
    let levels = stock::apply(&txn, &booked.reversed()).await?;

    if let Some(invoice) = SalesInvoice::find_by_id(document.sales_invoice_id)
        .one(&txn)
        .await?
    {
        adjust_invoice_total(&txn, invoice, document.total_amount).await?;
    }

    ReturnItem::delete_many()
        .filter(return_item::Column::ReturnInvoiceId.eq(id))
        .exec(&txn)
        .await?;
    ReturnInvoice::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!("Sales return #{} deleted", id);

    Ok(DeletedDocument { id, stock: levels })
}
