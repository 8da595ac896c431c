//! Statistics Service - vendor and sales aggregates

use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::domain::DomainError;
use crate::models::{
    product, product_variant, purchase_invoice, purchase_return_invoice, return_invoice,
    sales_invoice, sales_item, vendor,
};
use crate::services::lines::{self, round_money};
use crate::services::sales_service::SalesFilter;

#[derive(Debug, Clone, Default, Serialize)]
pub struct VendorStatistics {
    pub vendor_id: i32,
    pub vendor_name: String,
    pub purchase_count: u64,
    pub purchase_total: f64,
    pub purchase_return_total: f64,
    pub net_purchases: f64,
    pub product_count: u64,
    pub units_in_stock: i64,
    /// Stock valued at buying price
    pub stock_value: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DailySales {
    pub date: String,
    pub invoice_count: u64,
    pub net_sales: f64,
    pub units_sold: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SalesStatistics {
    pub from: Option<String>,
    pub to: Option<String>,
    pub invoice_count: u64,
    pub gross_sales: f64,
    pub returned_amount: f64,
    pub net_sales: f64,
    pub units_sold: i64,
    pub estimated_profit: f64,
    pub daily: Vec<DailySales>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopProduct {
    pub product_id: i32,
    pub code: String,
    pub description: String,
    pub units_sold: i64,
    pub revenue: f64,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TopProductsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<u64>,
}

/// Per-vendor purchasing and stock figures, ordered by vendor name
pub async fn vendor_statistics(db: &DatabaseConnection) -> Result<Vec<VendorStatistics>, DomainError> {
    let vendors = vendor::Entity::find()
        .order_by_asc(vendor::Column::Name)
        .all(db)
        .await?;

    let mut stats: BTreeMap<i32, VendorStatistics> = vendors
        .into_iter()
        .map(|v| {
            (
                v.id,
                VendorStatistics {
                    vendor_id: v.id,
                    vendor_name: v.name,
                    ..Default::default()
                },
            )
        })
        .collect();

    let purchases: Vec<(i32, f64)> = purchase_invoice::Entity::find()
        .select_only()
        .column(purchase_invoice::Column::VendorId)
        .column(purchase_invoice::Column::TotalAmount)
        .into_tuple()
        .all(db)
        .await?;
    for (vendor_id, total) in purchases {
        if let Some(entry) = stats.get_mut(&vendor_id) {
            entry.purchase_count += 1;
            entry.purchase_total += total;
        }
    }

    let returns: Vec<(i32, f64)> = purchase_return_invoice::Entity::find()
        .select_only()
        .column(purchase_return_invoice::Column::VendorId)
        .column(purchase_return_invoice::Column::TotalAmount)
        .into_tuple()
        .all(db)
        .await?;
    for (vendor_id, total) in returns {
        if let Some(entry) = stats.get_mut(&vendor_id) {
            entry.purchase_return_total += total;
        }
    }

    let products = product::Entity::find()
        .find_with_related(product_variant::Entity)
        .all(db)
        .await?;
    for (product, variants) in products {
        if let Some(entry) = stats.get_mut(&product.vendor_id) {
            entry.product_count += 1;
            let units: i64 = variants.iter().map(|v| i64::from(v.stock)).sum();
            entry.units_in_stock += units;
            entry.stock_value += units as f64 * product.buying_price;
        }
    }

    let mut result: Vec<VendorStatistics> = stats
        .into_values()
        .map(|mut s| {
            s.purchase_total = round_money(s.purchase_total);
            s.purchase_return_total = round_money(s.purchase_return_total);
            s.net_purchases = round_money(s.purchase_total - s.purchase_return_total);
            s.stock_value = round_money(s.stock_value);
            s
        })
        .collect();
    result.sort_by(|a, b| a.vendor_name.cmp(&b.vendor_name));

    Ok(result)
}

async fn invoices_in_range(
    db: &DatabaseConnection,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Vec<sales_invoice::Model>, DomainError> {
    let mut condition = Condition::all();
    if let Some(from) = lines::date_bound(from)? {
        condition = condition.add(sales_invoice::Column::InvoiceDate.gte(from));
    }
    if let Some(to) = lines::date_bound(to)? {
        condition = condition.add(sales_invoice::Column::InvoiceDate.lte(to));
    }

    Ok(sales_invoice::Entity::find()
        .filter(condition)
        .order_by_asc(sales_invoice::Column::InvoiceDate)
        .all(db)
        .await?)
}

/// Sales lines of the given invoices, each with the product it sold
async fn lines_with_products(
    db: &DatabaseConnection,
    invoice_ids: &[i32],
) -> Result<Vec<(sales_item::Model, product::Model)>, DomainError> {
    let items = sales_item::Entity::find()
        .filter(sales_item::Column::SalesInvoiceId.is_in(invoice_ids.to_vec()))
        .all(db)
        .await?;
    let variants = lines::load_variants(db, items.iter().map(|i| i.variant_id)).await?;

    Ok(items
        .into_iter()
        .filter_map(|item| {
            let product = variants.get(&item.variant_id).map(|(_, p)| p.clone())?;
            Some((item, product))
        })
        .collect())
}

/// Sales figures for invoices dated within `from..=to` (either bound optional).
/// Amounts are net of customer returns; `gross_sales` adds the refunds back.
pub async fn sales_statistics(
    db: &DatabaseConnection,
    filter: SalesFilter,
) -> Result<SalesStatistics, DomainError> {
    let invoices = invoices_in_range(db, filter.from.as_deref(), filter.to.as_deref()).await?;
    let ids: Vec<i32> = invoices.iter().map(|i| i.id).collect();
    let date_of: HashMap<i32, &str> = invoices
        .iter()
        .map(|i| (i.id, i.invoice_date.as_str()))
        .collect();

    let mut daily: BTreeMap<String, DailySales> = BTreeMap::new();
    let mut stats = SalesStatistics {
        from: filter.from,
        to: filter.to,
        invoice_count: invoices.len() as u64,
        ..Default::default()
    };

    for invoice in &invoices {
        stats.net_sales += invoice.total_amount;
        let day = daily
            .entry(invoice.invoice_date.clone())
            .or_insert_with(|| DailySales {
                date: invoice.invoice_date.clone(),
                ..Default::default()
            });
        day.invoice_count += 1;
        day.net_sales += invoice.total_amount;
    }

    for (item, product) in lines_with_products(db, &ids).await? {
        let units = i64::from(item.quantity);
        stats.units_sold += units;
        stats.estimated_profit += item.line_total - units as f64 * product.buying_price;
        if let Some(day) = date_of
            .get(&item.sales_invoice_id)
            .and_then(|date| daily.get_mut(*date))
        {
            day.units_sold += units;
        }
    }

    let refunds: Vec<f64> = return_invoice::Entity::find()
        .select_only()
        .column(return_invoice::Column::TotalAmount)
        .filter(return_invoice::Column::SalesInvoiceId.is_in(ids))
        .into_tuple()
        .all(db)
        .await?;
    stats.returned_amount = round_money(refunds.iter().sum());

    stats.net_sales = round_money(stats.net_sales);
    stats.gross_sales = round_money(stats.net_sales + stats.returned_amount);
    stats.estimated_profit = round_money(stats.estimated_profit);
    stats.daily = daily
        .into_values()
        .map(|mut d| {
            d.net_sales = round_money(d.net_sales);
            d
        })
        .collect();

    Ok(stats)
}

/// Best sellers by units, ties broken by revenue
pub async fn top_products(
    db: &DatabaseConnection,
    query: TopProductsQuery,
) -> Result<Vec<TopProduct>, DomainError> {
    let invoices = invoices_in_range(db, query.from.as_deref(), query.to.as_deref()).await?;
    let ids: Vec<i32> = invoices.iter().map(|i| i.id).collect();

    let mut totals: HashMap<i32, TopProduct> = HashMap::new();
    for (item, product) in lines_with_products(db, &ids).await? {
        let entry = totals.entry(product.id).or_insert_with(|| TopProduct {
            product_id: product.id,
            code: product.code.clone(),
            description: product.description.clone(),
            units_sold: 0,
            revenue: 0.0,
        });
        entry.units_sold += i64::from(item.quantity);
        entry.revenue += item.line_total;
    }

    let mut ranked: Vec<TopProduct> = totals
        .into_values()
        .filter(|p| p.units_sold > 0)
        .map(|mut p| {
            p.revenue = round_money(p.revenue);
            p
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.units_sold
            .cmp(&a.units_sold)
            .then(b.revenue.total_cmp(&a.revenue))
            .then(a.code.cmp(&b.code))
    });
    ranked.truncate(query.limit.unwrap_or(10).clamp(1, 100) as usize);

    Ok(ranked)
}
