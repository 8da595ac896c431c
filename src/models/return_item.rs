use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "return_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub return_invoice_id: i32,
    pub sales_item_id: i32,
    pub variant_id: i32,
    pub quantity: i32,
    /// Effective (post-discount) unit price refunded
    pub unit_price: f64,
    pub line_total: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::return_invoice::Entity",
        from = "Column::ReturnInvoiceId",
        to = "super::return_invoice::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    ReturnInvoice,
    #[sea_orm(
        belongs_to = "super::sales_item::Entity",
        from = "Column::SalesItemId",
        to = "super::sales_item::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    SalesItem,
}

impl Related<super::return_invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReturnInvoice.def()
    }
}

impl Related<super::sales_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
