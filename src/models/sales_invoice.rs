use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_invoices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub invoice_date: String,
    pub customer_name: Option<String>,
    pub payment_method: String, // 'cash', 'card', ...
    /// Current invoice total; reduced whenever a return is booked against it
    pub total_amount: f64,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sales_item::Entity")]
    Items,
    #[sea_orm(has_many = "super::return_invoice::Entity")]
    Returns,
}

impl Related<super::sales_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::return_invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Returns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
