use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vendors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Lowercased name backing the case-insensitive uniqueness rule
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub name_key: String,
    /// Uppercase prefix used when suggesting product codes (e.g. `ACM` -> `ACM-0001`)
    pub code_prefix: String,
    pub address: Option<String>,
    pub contact: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
    #[sea_orm(has_many = "super::purchase_invoice::Entity")]
    PurchaseInvoices,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::purchase_invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseInvoices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
