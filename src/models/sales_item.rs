use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub sales_invoice_id: i32,
    pub variant_id: i32,
    /// Quantity still held by the customer (sold minus returned)
    pub quantity: i32,
    pub unit_price: f64,
    /// Discount in percent, 0..=100
    pub discount: f64,
    pub line_total: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sales_invoice::Entity",
        from = "Column::SalesInvoiceId",
        to = "super::sales_invoice::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Invoice,
    #[sea_orm(
        belongs_to = "super::product_variant::Entity",
        from = "Column::VariantId",
        to = "super::product_variant::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Variant,
}

impl Related<super::sales_invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Price actually charged per unit after the line discount
    pub fn effective_unit_price(&self) -> f64 {
        self.unit_price * (1.0 - self.discount / 100.0)
    }
}
