//! SeaORM implementation of ProductRepository

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;

use crate::domain::{
    DomainError, Product, ProductFilter, ProductInput, ProductRepository, Variant, VariantInput,
    VariantLookup,
};
use crate::models::product::{self, ActiveModel, Column, Entity as ProductEntity};
use crate::models::product_variant::{self, Entity as VariantEntity};
use crate::models::{purchase_item, purchase_return_item, sales_item, vendor};

/// SeaORM-based implementation of ProductRepository
pub struct SeaOrmProductRepository {
    db: DatabaseConnection,
}

impl SeaOrmProductRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn ensure_vendor(&self, vendor_id: i32) -> Result<vendor::Model, DomainError> {
        vendor::Entity::find_by_id(vendor_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Vendor"))
    }

    async fn ensure_unique_code(&self, code: &str, exclude: Option<i32>) -> Result<(), DomainError> {
        let mut query = ProductEntity::find().filter(Column::Code.eq(code));
        if let Some(id) = exclude {
            query = query.filter(Column::Id.ne(id));
        }

        if query.one(&self.db).await?.is_some() {
            return Err(DomainError::conflict(format!(
                "Product code '{}' is already in use",
                code
            )));
        }
        Ok(())
    }

    /// Attach vendor names and variants to a batch of products
    async fn assemble(
        &self,
        rows: Vec<(product::Model, Option<vendor::Model>)>,
    ) -> Result<Vec<Product>, DomainError> {
        let product_ids: Vec<i32> = rows.iter().map(|(p, _)| p.id).collect();

        let mut variants_by_product: HashMap<i32, Vec<Variant>> = HashMap::new();
        if !product_ids.is_empty() {
            let variants = VariantEntity::find()
                .filter(product_variant::Column::ProductId.is_in(product_ids))
                .order_by_asc(product_variant::Column::Id)
                .all(&self.db)
                .await?;

            for v in variants {
                variants_by_product
                    .entry(v.product_id)
                    .or_default()
                    .push(Variant {
                        id: v.id,
                        color: v.color,
                        size: v.size,
                        stock: v.stock,
                    });
            }
        }

        Ok(rows
            .into_iter()
            .map(|(p, v)| {
                let variants = variants_by_product.remove(&p.id).unwrap_or_default();
                let total_stock = variants.iter().map(|v| v.stock).sum();
                Product {
                    id: p.id,
                    vendor_id: p.vendor_id,
                    vendor_name: v.map(|v| v.name),
                    code: p.code,
                    description: p.description,
                    buying_price: p.buying_price,
                    selling_price: p.selling_price,
                    discount_limit: p.discount_limit,
                    is_active: p.is_active,
                    season: p.season,
                    variants,
                    total_stock,
                }
            })
            .collect())
    }

    async fn load(&self, id: i32) -> Result<Product, DomainError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product"))
    }
}

/// A variant is in use once any stock document references it
async fn variant_in_use<C: ConnectionTrait>(conn: &C, variant_id: i32) -> Result<bool, DomainError> {
    let purchases = purchase_item::Entity::find()
        .filter(purchase_item::Column::VariantId.eq(variant_id))
        .count(conn)
        .await?;
    let purchase_returns = purchase_return_item::Entity::find()
        .filter(purchase_return_item::Column::VariantId.eq(variant_id))
        .count(conn)
        .await?;
    let sales = sales_item::Entity::find()
        .filter(sales_item::Column::VariantId.eq(variant_id))
        .count(conn)
        .await?;

    Ok(purchases + purchase_returns + sales > 0)
}

/// Refuse to drop a variant that still holds stock or has history
async fn ensure_removable<C: ConnectionTrait>(
    conn: &C,
    variant: &product_variant::Model,
) -> Result<(), DomainError> {
    if variant.stock > 0 {
        return Err(DomainError::conflict(format!(
            "Variant {} / {} still has {} unit(s) in stock",
            variant.color, variant.size, variant.stock
        )));
    }
    if variant_in_use(conn, variant.id).await? {
        return Err(DomainError::conflict(format!(
            "Variant {} / {} appears on invoices",
            variant.color, variant.size
        )));
    }
    Ok(())
}

#[async_trait]
impl ProductRepository for SeaOrmProductRepository {
    async fn find_all(&self, filter: ProductFilter) -> Result<Vec<Product>, DomainError> {
        let mut condition = Condition::all();

        if let Some(vendor_id) = filter.vendor_id {
            condition = condition.add(Column::VendorId.eq(vendor_id));
        }
        if let Some(active) = filter.active {
            condition = condition.add(Column::IsActive.eq(active));
        }
        if let Some(q) = filter.query.as_deref().map(str::trim)
            && !q.is_empty()
        {
            condition = condition.add(
                Condition::any()
                    .add(Column::Code.contains(q.to_uppercase()))
                    .add(Column::Description.contains(q)),
            );
        }

        let rows = ProductEntity::find()
            .filter(condition)
            .order_by_asc(Column::Code)
            .find_also_related(vendor::Entity)
            .all(&self.db)
            .await?;

        self.assemble(rows).await
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Product>, DomainError> {
        let row = ProductEntity::find_by_id(id)
            .find_also_related(vendor::Entity)
            .one(&self.db)
            .await?;

        match row {
            Some(row) => Ok(self.assemble(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn create(&self, input: ProductInput) -> Result<Product, DomainError> {
        let input = input.normalized()?;
        self.ensure_vendor(input.vendor_id).await?;
        self.ensure_unique_code(&input.code, None).await?;

        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.db.begin().await?;

        let saved = ActiveModel {
            vendor_id: Set(input.vendor_id),
            code: Set(input.code),
            description: Set(input.description),
            buying_price: Set(input.buying_price),
            selling_price: Set(input.selling_price),
            discount_limit: Set(input.discount_limit),
            is_active: Set(input.is_active.unwrap_or(true)),
            season: Set(input.season),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for v in input.variants {
            product_variant::ActiveModel {
                product_id: Set(saved.id),
                color: Set(v.color),
                size: Set(v.size),
                stock: Set(0),
                created_at: Set(now.clone()),
                updated_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        tracing::info!("Product #{} '{}' created", saved.id, saved.code);

        self.load(saved.id).await
    }

    async fn update(&self, id: i32, input: ProductInput) -> Result<Product, DomainError> {
        let input = input.normalized()?;

        let existing = ProductEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Product"))?;
        self.ensure_vendor(input.vendor_id).await?;
        self.ensure_unique_code(&input.code, Some(id)).await?;

        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.db.begin().await?;

        let mut current: HashMap<i32, product_variant::Model> = VariantEntity::find()
            .filter(product_variant::Column::ProductId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        // Split the input into kept variants (must belong to this product) and new ones
        let mut kept = Vec::new();
        let mut added = Vec::new();
        for v in input.variants {
            match v.id {
                Some(variant_id) => match current.remove(&variant_id) {
                    Some(model) => kept.push((model, v)),
                    None => {
                        return Err(DomainError::validation(format!(
                            "Variant {} does not belong to product {}",
                            variant_id, id
                        )));
                    }
                },
                None => added.push(v),
            }
        }

        // Whatever is left in `current` was dropped from the input
        for removed in current.into_values() {
            ensure_removable(&txn, &removed).await?;
            VariantEntity::delete_by_id(removed.id).exec(&txn).await?;
        }

        // Renamed rows may trade colour/size with each other, so park them on a
        // placeholder first to keep UNIQUE(product_id, color, size) satisfied
        let renamed: Vec<(product_variant::Model, VariantInput)> = kept
            .into_iter()
            .filter(|(model, v)| model.color != v.color || model.size != v.size)
            .collect();

        for (model, _) in &renamed {
            product_variant::Entity::update_many()
                .col_expr(
                    product_variant::Column::Color,
                    Expr::value(format!("#tmp-{}", model.id)),
                )
                .filter(product_variant::Column::Id.eq(model.id))
                .exec(&txn)
                .await?;
        }

        for (model, v) in renamed {
            let mut active: product_variant::ActiveModel = model.into();
            active.color = Set(v.color);
            active.size = Set(v.size);
            active.updated_at = Set(now.clone());
            active.update(&txn).await?;
        }

        for v in added {
            product_variant::ActiveModel {
                product_id: Set(id),
                color: Set(v.color),
                size: Set(v.size),
                stock: Set(0),
                created_at: Set(now.clone()),
                updated_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        let mut active: ActiveModel = existing.into();
        active.vendor_id = Set(input.vendor_id);
        active.code = Set(input.code);
        active.description = Set(input.description);
        active.buying_price = Set(input.buying_price);
        active.selling_price = Set(input.selling_price);
        active.discount_limit = Set(input.discount_limit);
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.season = Set(input.season);
        active.updated_at = Set(now);
        active.update(&txn).await?;

        txn.commit().await?;

        self.load(id).await
    }

    async fn set_active(&self, id: i32, is_active: bool) -> Result<Product, DomainError> {
        let existing = ProductEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Product"))?;

        let mut active: ActiveModel = existing.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.db).await?;

        self.load(id).await
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let txn = self.db.begin().await?;

        if ProductEntity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(DomainError::not_found("Product"));
        }

        let variants = VariantEntity::find()
            .filter(product_variant::Column::ProductId.eq(id))
            .all(&txn)
            .await?;
        for v in &variants {
            ensure_removable(&txn, v).await?;
        }

        VariantEntity::delete_many()
            .filter(product_variant::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        ProductEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        tracing::info!("Product #{} deleted with {} variant(s)", id, variants.len());

        Ok(())
    }

    async fn search_variants(
        &self,
        query: Option<String>,
        limit: u64,
    ) -> Result<Vec<VariantLookup>, DomainError> {
        let mut select = VariantEntity::find().find_also_related(ProductEntity);

        if let Some(q) = query.as_deref().map(str::trim)
            && !q.is_empty()
        {
            select = select.filter(
                Condition::any()
                    .add(Column::Code.contains(q.to_uppercase()))
                    .add(Column::Description.contains(q)),
            );
        }

        let rows = select
            .order_by_asc(Column::Code)
            .order_by_asc(product_variant::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(v, p)| {
                p.map(|p| VariantLookup {
                    variant_id: v.id,
                    product_id: p.id,
                    vendor_id: p.vendor_id,
                    product_code: p.code,
                    description: p.description,
                    color: v.color,
                    size: v.size,
                    stock: v.stock,
                    buying_price: p.buying_price,
                    selling_price: p.selling_price,
                    discount_limit: p.discount_limit,
                    is_active: p.is_active,
                })
            })
            .collect())
    }
}
