pub mod product;
pub mod product_variant;
pub mod purchase_invoice;
pub mod purchase_item;
pub mod purchase_return_invoice;
pub mod purchase_return_item;
pub mod return_invoice;
pub mod return_item;
pub mod sales_invoice;
pub mod sales_item;
pub mod user;
pub mod vendor;
