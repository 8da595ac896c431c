use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Customer return booked against a prior sales invoice
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "return_invoices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub sales_invoice_id: i32,
    pub return_date: String,
    pub total_amount: f64,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sales_invoice::Entity",
        from = "Column::SalesInvoiceId",
        to = "super::sales_invoice::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    SalesInvoice,
    #[sea_orm(has_many = "super::return_item::Entity")]
    Items,
}

impl Related<super::sales_invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesInvoice.def()
    }
}

impl Related<super::return_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
