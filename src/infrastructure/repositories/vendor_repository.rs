//! SeaORM implementation of VendorRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::collections::HashMap;

use crate::domain::{DomainError, Vendor, VendorInput, VendorRepository};
use crate::models::vendor::{ActiveModel, Column, Entity as VendorEntity, Model};
use crate::models::{product, purchase_invoice, purchase_return_invoice};

/// SeaORM-based implementation of VendorRepository
pub struct SeaOrmVendorRepository {
    db: DatabaseConnection,
}

impl SeaOrmVendorRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn ensure_unique_name(&self, name: &str, exclude: Option<i32>) -> Result<(), DomainError> {
        let mut query = VendorEntity::find().filter(Column::NameKey.eq(name_key(name)));
        if let Some(id) = exclude {
            query = query.filter(Column::Id.ne(id));
        }

        if query.one(&self.db).await?.is_some() {
            return Err(DomainError::conflict(format!(
                "A vendor named '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    async fn product_count(&self, vendor_id: i32) -> Result<u64, DomainError> {
        Ok(product::Entity::find()
            .filter(product::Column::VendorId.eq(vendor_id))
            .count(&self.db)
            .await?)
    }
}

/// Unicode-aware case folding, SQLite's LOWER() only covers ASCII
pub(crate) fn name_key(name: &str) -> String {
    name.to_lowercase()
}

fn to_vendor(model: Model, product_count: u64) -> Vendor {
    Vendor {
        id: model.id,
        name: model.name,
        code_prefix: model.code_prefix,
        address: model.address,
        contact: model.contact,
        notes: model.notes,
        product_count,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

/// Next `PREFIX-NNNN` code after the highest numbered code already taken
pub(crate) fn next_code(prefix: &str, taken: &[String]) -> String {
    let head = format!("{}-", prefix);
    let highest = taken
        .iter()
        .filter_map(|code| code.strip_prefix(&head))
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    format!("{}{:04}", head, highest + 1)
}

#[async_trait]
impl VendorRepository for SeaOrmVendorRepository {
    async fn find_all(&self) -> Result<Vec<Vendor>, DomainError> {
        let vendors = VendorEntity::find()
            .order_by_asc(Column::Name)
            .all(&self.db)
            .await?;

        let vendor_ids: Vec<i32> = product::Entity::find()
            .select_only()
            .column(product::Column::VendorId)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut counts: HashMap<i32, u64> = HashMap::new();
        for vendor_id in vendor_ids {
            *counts.entry(vendor_id).or_insert(0) += 1;
        }

        Ok(vendors
            .into_iter()
            .map(|v| {
                let count = counts.get(&v.id).copied().unwrap_or(0);
                to_vendor(v, count)
            })
            .collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Vendor>, DomainError> {
        match VendorEntity::find_by_id(id).one(&self.db).await? {
            Some(model) => {
                let count = self.product_count(id).await?;
                Ok(Some(to_vendor(model, count)))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, input: VendorInput) -> Result<Vendor, DomainError> {
        let input = input.normalized()?;
        self.ensure_unique_name(&input.name, None).await?;

        let now = chrono::Utc::now().to_rfc3339();
        let vendor = ActiveModel {
            name_key: Set(name_key(&input.name)),
            name: Set(input.name),
            code_prefix: Set(input.code_prefix),
            address: Set(input.address),
            contact: Set(input.contact),
            notes: Set(input.notes),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = vendor.insert(&self.db).await?;
        tracing::info!("Vendor #{} '{}' created", result.id, result.name);

        Ok(to_vendor(result, 0))
    }

    async fn update(&self, id: i32, input: VendorInput) -> Result<Vendor, DomainError> {
        let input = input.normalized()?;

        let existing = VendorEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Vendor"))?;

        self.ensure_unique_name(&input.name, Some(id)).await?;

        let mut active: ActiveModel = existing.into();
        active.name_key = Set(name_key(&input.name));
        active.name = Set(input.name);
        active.code_prefix = Set(input.code_prefix);
        active.address = Set(input.address);
        active.contact = Set(input.contact);
        active.notes = Set(input.notes);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let result = active.update(&self.db).await?;
        let count = self.product_count(id).await?;

        Ok(to_vendor(result, count))
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        if VendorEntity::find_by_id(id).one(&self.db).await?.is_none() {
            return Err(DomainError::not_found("Vendor"));
        }

        if self.product_count(id).await? > 0 {
            return Err(DomainError::conflict(
                "Vendor still has products; delete or move them first",
            ));
        }

        let invoices = purchase_invoice::Entity::find()
            .filter(purchase_invoice::Column::VendorId.eq(id))
            .count(&self.db)
            .await?;
        let returns = purchase_return_invoice::Entity::find()
            .filter(purchase_return_invoice::Column::VendorId.eq(id))
            .count(&self.db)
            .await?;
        if invoices + returns > 0 {
            return Err(DomainError::conflict(
                "Vendor is referenced by purchase documents",
            ));
        }

        VendorEntity::delete_by_id(id).exec(&self.db).await?;
        tracing::info!("Vendor #{} deleted", id);

        Ok(())
    }

    async fn next_product_code(&self, id: i32) -> Result<String, DomainError> {
        let vendor = VendorEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| DomainError::not_found("Vendor"))?;

        // Codes are globally unique, so look at every product sharing the prefix
        let taken: Vec<String> = product::Entity::find()
            .select_only()
            .column(product::Column::Code)
            .filter(product::Column::Code.starts_with(format!("{}-", vendor.code_prefix)))
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(next_code(&vendor.code_prefix, &taken))
    }
}

#[cfg(test)]
mod tests {
    use super::{name_key, next_code};

    #[test]
    fn name_key_folds_accented_capitals() {
        assert_eq!(name_key("Élan"), name_key("éLAN"));
        assert_eq!(name_key("ÖKO"), "öko");
    }

    #[test]
    fn next_code_starts_at_one() {
        assert_eq!(next_code("ACM", &[]), "ACM-0001");
    }

    #[test]
    fn next_code_skips_past_highest_numeric_suffix() {
        let taken = vec![
            "ACM-0002".to_string(),
            "ACM-0010".to_string(),
            "ACM-SPECIAL".to_string(),
            "ACMX-0099".to_string(),
        ];
        assert_eq!(next_code("ACM", &taken), "ACM-0011");
    }
}
