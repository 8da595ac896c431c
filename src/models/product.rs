use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub vendor_id: i32,
    #[sea_orm(unique)]
    pub code: String,
    pub description: String,
    pub buying_price: f64,
    pub selling_price: f64,
    /// Maximum discount (percent) a cashier may grant on this product.
    /// NULL means no limit.
    pub discount_limit: Option<f64>,
    pub is_active: bool,
    pub season: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vendor::Entity",
        from = "Column::VendorId",
        to = "super::vendor::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Vendor,
    #[sea_orm(has_many = "super::product_variant::Entity")]
    Variants,
}

impl Related<super::vendor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendor.def()
    }
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
