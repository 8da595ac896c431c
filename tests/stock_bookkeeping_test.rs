use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use shopkeeper::db;
use shopkeeper::domain::{
    DomainError, Product, ProductInput, ProductRepository, VariantInput, VendorInput,
    VendorRepository,
};
use shopkeeper::infrastructure::{SeaOrmProductRepository, SeaOrmVendorRepository};
use shopkeeper::models::{product_variant, purchase_invoice, sales_invoice};
use shopkeeper::services::lines::LineInput;
use shopkeeper::services::purchase_return_service::{self, PurchaseReturnInput};
use shopkeeper::services::purchase_service::{self, PurchaseInvoiceInput};
use shopkeeper::services::sales_return_service::{self, ReturnLineInput, SalesReturnInput};
use shopkeeper::services::sales_service::{self, SalesFilter, SalesInvoiceInput, SalesItemInput};
use shopkeeper::services::statistics_service;

// Helper to create a test database
async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn create_vendor(db: &DatabaseConnection, name: &str, prefix: &str) -> i32 {
    SeaOrmVendorRepository::new(db.clone())
        .create(VendorInput {
            name: name.to_string(),
            code_prefix: prefix.to_string(),
            address: None,
            contact: None,
            notes: None,
        })
        .await
        .expect("Failed to create vendor")
        .id
}

// Product with one "blue" variant per size
async fn create_product(
    db: &DatabaseConnection,
    vendor_id: i32,
    code: &str,
    discount_limit: Option<f64>,
    sizes: &[&str],
) -> Product {
    SeaOrmProductRepository::new(db.clone())
        .create(ProductInput {
            vendor_id,
            code: code.to_string(),
            description: format!("Product {}", code),
            buying_price: 10.0,
            selling_price: 25.0,
            discount_limit,
            is_active: None,
            season: None,
            variants: sizes
                .iter()
                .map(|s| VariantInput {
                    id: None,
                    color: "blue".to_string(),
                    size: s.to_string(),
                })
                .collect(),
        })
        .await
        .expect("Failed to create product")
}

async fn stock_of(db: &DatabaseConnection, variant_id: i32) -> i32 {
    product_variant::Entity::find_by_id(variant_id)
        .one(db)
        .await
        .expect("query")
        .expect("variant exists")
        .stock
}

fn line(variant_id: i32, quantity: i32) -> LineInput {
    LineInput {
        variant_id,
        quantity,
        unit_price: 10.0,
    }
}

async fn purchase(db: &DatabaseConnection, vendor_id: i32, items: Vec<LineInput>) -> i32 {
    purchase_service::create_purchase(
        db,
        PurchaseInvoiceInput {
            vendor_id,
            invoice_date: Some("2024-05-01".to_string()),
            notes: None,
            items,
        },
    )
    .await
    .expect("Failed to record purchase")
    .invoice
    .id
}

fn sale_input(items: Vec<(i32, i32, Option<f64>)>) -> SalesInvoiceInput {
    SalesInvoiceInput {
        invoice_date: Some("2024-05-02".to_string()),
        customer_name: Some("Walk-in".to_string()),
        payment_method: None,
        notes: None,
        items: items
            .into_iter()
            .map(|(variant_id, quantity, discount)| SalesItemInput {
                variant_id,
                quantity,
                unit_price: None,
                discount,
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_purchase_create_then_delete_restores_stock() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "acm").await;
    let product = create_product(&db, vendor_id, "ACM-0001", None, &["S", "M"]).await;
    let (s, m) = (product.variants[0].id, product.variants[1].id);

    let invoice_id = purchase(&db, vendor_id, vec![line(s, 5), line(m, 3)]).await;
    assert_eq!(stock_of(&db, s).await, 5);
    assert_eq!(stock_of(&db, m).await, 3);

    let invoice = purchase_service::get_purchase(&db, invoice_id).await.unwrap();
    assert_eq!(invoice.invoice.total_amount, 80.0);
    assert_eq!(invoice.items.len(), 2);

    let deleted = purchase_service::delete_purchase(&db, invoice_id).await.unwrap();
    assert_eq!(deleted.stock.len(), 2);
    assert_eq!(stock_of(&db, s).await, 0);
    assert_eq!(stock_of(&db, m).await, 0);
}

#[tokio::test]
async fn test_purchase_delete_rejected_when_goods_were_sold() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", None, &["S", "M"]).await;
    let (s, m) = (product.variants[0].id, product.variants[1].id);

    let invoice_id = purchase(&db, vendor_id, vec![line(s, 5), line(m, 3)]).await;
    sales_service::create_sale(&db, sale_input(vec![(m, 2, None)]))
        .await
        .unwrap();

    let err = purchase_service::delete_purchase(&db, invoice_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::InsufficientStock {
            available: 1,
            requested: 3,
            ..
        }
    ));

    // Nothing was applied, not even the line that had enough stock
    assert_eq!(stock_of(&db, s).await, 5);
    assert_eq!(stock_of(&db, m).await, 1);
    assert!(
        purchase_invoice::Entity::find_by_id(invoice_id)
            .one(&db)
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_purchase_update_applies_net_difference() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", None, &["S", "M", "L"]).await;
    let (s, m, l) = (
        product.variants[0].id,
        product.variants[1].id,
        product.variants[2].id,
    );

    let invoice_id = purchase(&db, vendor_id, vec![line(s, 5), line(m, 3)]).await;
    sales_service::create_sale(&db, sale_input(vec![(s, 4, None)]))
        .await
        .unwrap();

    // S: 5 -> 4 purchased while only 1 left on the shelf; still fine as a net -1
    let updated = purchase_service::update_purchase(
        &db,
        invoice_id,
        PurchaseInvoiceInput {
            vendor_id,
            invoice_date: None,
            notes: Some("corrected".to_string()),
            items: vec![line(s, 4), line(l, 2)],
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.items.len(), 2);
    assert_eq!(updated.invoice.total_amount, 60.0);
    assert_eq!(stock_of(&db, s).await, 0);
    assert_eq!(stock_of(&db, m).await, 0);
    assert_eq!(stock_of(&db, l).await, 2);
}

#[tokio::test]
async fn test_purchase_rejects_variant_of_another_vendor() {
    let db = setup_test_db().await;
    let acme = create_vendor(&db, "Acme", "ACM").await;
    let other = create_vendor(&db, "Other", "OTH").await;
    let product = create_product(&db, other, "OTH-0001", None, &["M"]).await;

    let err = purchase_service::create_purchase(
        &db,
        PurchaseInvoiceInput {
            vendor_id: acme,
            invoice_date: None,
            notes: None,
            items: vec![line(product.variants[0].id, 1)],
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DomainError::Validation(_)));
    assert_eq!(stock_of(&db, product.variants[0].id).await, 0);
}

#[tokio::test]
async fn test_sale_beyond_stock_is_rejected_as_a_whole() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", None, &["S", "M"]).await;
    let (s, m) = (product.variants[0].id, product.variants[1].id);
    purchase(&db, vendor_id, vec![line(s, 5), line(m, 1)]).await;

    let err = sales_service::create_sale(&db, sale_input(vec![(s, 2, None), (m, 2, None)]))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InsufficientStock { .. }));

    assert_eq!(stock_of(&db, s).await, 5);
    assert_eq!(stock_of(&db, m).await, 1);
    assert_eq!(sales_invoice::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_sale_create_and_delete_round_trip_stock() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", Some(20.0), &["M"]).await;
    let m = product.variants[0].id;
    purchase(&db, vendor_id, vec![line(m, 6)]).await;

    let sale = sales_service::create_sale(&db, sale_input(vec![(m, 2, Some(10.0))]))
        .await
        .unwrap();
    assert_eq!(sale.invoice.payment_method, "cash");
    assert_eq!(sale.invoice.total_amount, 45.0);
    assert_eq!(sale.items[0].unit_price, 25.0);
    assert_eq!(stock_of(&db, m).await, 4);

    sales_service::delete_sale(&db, sale.invoice.id).await.unwrap();
    assert_eq!(stock_of(&db, m).await, 6);
    assert!(
        sales_service::list_sales(&db, SalesFilter::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_sale_update_swaps_lines() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", None, &["S", "M"]).await;
    let (s, m) = (product.variants[0].id, product.variants[1].id);
    purchase(&db, vendor_id, vec![line(s, 2), line(m, 2)]).await;

    let sale = sales_service::create_sale(&db, sale_input(vec![(s, 2, None)]))
        .await
        .unwrap();
    assert_eq!(stock_of(&db, s).await, 0);

    // Customer swaps both S for M; S goes back before M is taken
    sales_service::update_sale(&db, sale.invoice.id, sale_input(vec![(m, 2, None)]))
        .await
        .unwrap();
    assert_eq!(stock_of(&db, s).await, 2);
    assert_eq!(stock_of(&db, m).await, 0);
}

#[tokio::test]
async fn test_discount_above_product_limit_is_rejected() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", Some(15.0), &["M"]).await;
    let m = product.variants[0].id;
    purchase(&db, vendor_id, vec![line(m, 3)]).await;

    let err = sales_service::create_sale(&db, sale_input(vec![(m, 1, Some(30.0))]))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    assert_eq!(stock_of(&db, m).await, 3);
}

#[tokio::test]
async fn test_inactive_product_cannot_be_sold() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", None, &["M"]).await;
    let m = product.variants[0].id;
    purchase(&db, vendor_id, vec![line(m, 3)]).await;

    SeaOrmProductRepository::new(db.clone())
        .set_active(product.id, false)
        .await
        .unwrap();

    let err = sales_service::create_sale(&db, sale_input(vec![(m, 1, None)]))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_sales_return_shrinks_sale_and_restocks() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", Some(50.0), &["M"]).await;
    let m = product.variants[0].id;
    purchase(&db, vendor_id, vec![line(m, 5)]).await;

    // 3 x 25.00 at 20% off = 60.00
    let sale = sales_service::create_sale(&db, sale_input(vec![(m, 3, Some(20.0))]))
        .await
        .unwrap();
    assert_eq!(sale.invoice.total_amount, 60.0);
    assert_eq!(stock_of(&db, m).await, 2);

    let sales_item_id = sale.items[0].id;
    let ret = sales_return_service::create_sales_return(
        &db,
        SalesReturnInput {
            sales_invoice_id: sale.invoice.id,
            return_date: Some("2024-05-03".to_string()),
            notes: None,
            items: vec![ReturnLineInput {
                sales_item_id,
                quantity: 2,
            }],
        },
    )
    .await
    .unwrap();

    assert_eq!(ret.document.total_amount, 40.0);
    assert_eq!(ret.items[0].unit_price, 20.0);
    assert_eq!(stock_of(&db, m).await, 4);

    let after = sales_service::get_sale(&db, sale.invoice.id).await.unwrap();
    assert_eq!(after.invoice.total_amount, 20.0);
    assert_eq!(after.items[0].quantity, 1);
    assert_eq!(after.items[0].line_total, 20.0);
    assert_eq!(after.returns.len(), 1);

    // A sale with returns is frozen
    let err = sales_service::delete_sale(&db, sale.invoice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    // Only one unit is left to return
    let err = sales_return_service::create_sales_return(
        &db,
        SalesReturnInput {
            sales_invoice_id: sale.invoice.id,
            return_date: None,
            notes: None,
            items: vec![ReturnLineInput {
                sales_item_id,
                quantity: 2,
            }],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    // Deleting the return is the exact inverse
    sales_return_service::delete_sales_return(&db, ret.document.id)
        .await
        .unwrap();
    let restored = sales_service::get_sale(&db, sale.invoice.id).await.unwrap();
    assert_eq!(restored.invoice.total_amount, 60.0);
    assert_eq!(restored.items[0].quantity, 3);
    assert_eq!(restored.items[0].line_total, 60.0);
    assert!(restored.returns.is_empty());
    assert_eq!(stock_of(&db, m).await, 2);
}

#[tokio::test]
async fn test_sales_return_delete_rejected_when_restocked_goods_resold() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", None, &["M"]).await;
    let m = product.variants[0].id;
    purchase(&db, vendor_id, vec![line(m, 1)]).await;

    let sale = sales_service::create_sale(&db, sale_input(vec![(m, 1, None)]))
        .await
        .unwrap();
    let ret = sales_return_service::create_sales_return(
        &db,
        SalesReturnInput {
            sales_invoice_id: sale.invoice.id,
            return_date: None,
            notes: None,
            items: vec![ReturnLineInput {
                sales_item_id: sale.items[0].id,
                quantity: 1,
            }],
        },
    )
    .await
    .unwrap();
    sales_service::create_sale(&db, sale_input(vec![(m, 1, None)]))
        .await
        .unwrap();

    let err = sales_return_service::delete_sales_return(&db, ret.document.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InsufficientStock { .. }));

    // Sales line untouched by the failed delete
    let first = sales_service::get_sale(&db, sale.invoice.id).await.unwrap();
    assert_eq!(first.items[0].quantity, 0);
    assert_eq!(first.invoice.total_amount, 0.0);
}

#[tokio::test]
async fn test_purchase_return_limited_to_purchased_quantity() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", None, &["M"]).await;
    let m = product.variants[0].id;
    purchase(&db, vendor_id, vec![line(m, 4)]).await;

    let returned = purchase_return_service::create_purchase_return(
        &db,
        PurchaseReturnInput {
            vendor_id,
            return_date: None,
            notes: Some("damaged".to_string()),
            items: vec![line(m, 3)],
        },
    )
    .await
    .unwrap();
    assert_eq!(returned.document.total_amount, 30.0);
    assert_eq!(stock_of(&db, m).await, 1);

    let err = purchase_return_service::create_purchase_return(
        &db,
        PurchaseReturnInput {
            vendor_id,
            return_date: None,
            notes: None,
            items: vec![line(m, 2)],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    purchase_return_service::delete_purchase_return(&db, returned.document.id)
        .await
        .unwrap();
    assert_eq!(stock_of(&db, m).await, 4);
}

#[tokio::test]
async fn test_catalog_refuses_to_drop_stocked_variants() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", None, &["S", "M"]).await;
    purchase(&db, vendor_id, vec![line(product.variants[0].id, 1)]).await;

    let products = SeaOrmProductRepository::new(db.clone());
    let err = products.delete(product.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    let vendors = SeaOrmVendorRepository::new(db.clone());
    let err = vendors.delete(vendor_id).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    // The unused M variant can go
    let updated = products
        .update(
            product.id,
            ProductInput {
                vendor_id,
                code: "ACM-0001".to_string(),
                description: "Renamed".to_string(),
                buying_price: 10.0,
                selling_price: 25.0,
                discount_limit: None,
                is_active: None,
                season: None,
                variants: vec![VariantInput {
                    id: Some(product.variants[0].id),
                    color: "blue".to_string(),
                    size: "S".to_string(),
                }],
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.variants.len(), 1);
    assert_eq!(updated.total_stock, 1);
}

#[tokio::test]
async fn test_statistics_reflect_documents() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", None, &["M"]).await;
    let m = product.variants[0].id;
    purchase(&db, vendor_id, vec![line(m, 4)]).await;
    sales_service::create_sale(&db, sale_input(vec![(m, 3, None)]))
        .await
        .unwrap();

    let vendors = statistics_service::vendor_statistics(&db).await.unwrap();
    assert_eq!(vendors.len(), 1);
    assert_eq!(vendors[0].purchase_count, 1);
    assert_eq!(vendors[0].net_purchases, 40.0);
    assert_eq!(vendors[0].units_in_stock, 1);
    assert_eq!(vendors[0].stock_value, 10.0);

    let sales = statistics_service::sales_statistics(
        &db,
        SalesFilter {
            from: Some("2024-05-01".to_string()),
            to: Some("2024-05-31".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(sales.invoice_count, 1);
    assert_eq!(sales.net_sales, 75.0);
    assert_eq!(sales.units_sold, 3);
    assert_eq!(sales.estimated_profit, 45.0);
    assert_eq!(sales.daily.len(), 1);
    assert_eq!(sales.daily[0].date, "2024-05-02");

    let top = statistics_service::top_products(&db, Default::default())
        .await
        .unwrap();
    assert_eq!(top[0].code, "ACM-0001");
    assert_eq!(top[0].units_sold, 3);
}

#[tokio::test]
async fn test_purchase_return_update_reverses_then_applies() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", None, &["M"]).await;
    let m = product.variants[0].id;
    purchase(&db, vendor_id, vec![line(m, 4)]).await;

    let returned = purchase_return_service::create_purchase_return(
        &db,
        PurchaseReturnInput {
            vendor_id,
            return_date: None,
            notes: None,
            items: vec![line(m, 3)],
        },
    )
    .await
    .unwrap();
    assert_eq!(stock_of(&db, m).await, 1);
    let id = returned.document.id;

    let return_input = |quantity| PurchaseReturnInput {
        vendor_id,
        return_date: Some("2024-05-04".to_string()),
        notes: Some("recount".to_string()),
        items: vec![line(m, quantity)],
    };

    // The document's own 3 units do not count against the purchased 4
    let updated = purchase_return_service::update_purchase_return(&db, id, return_input(4))
        .await
        .unwrap();
    assert_eq!(updated.document.total_amount, 40.0);
    assert_eq!(stock_of(&db, m).await, 0);

    let updated = purchase_return_service::update_purchase_return(&db, id, return_input(2))
        .await
        .unwrap();
    assert_eq!(updated.items[0].quantity, 2);
    assert_eq!(stock_of(&db, m).await, 2);

    let err = purchase_return_service::update_purchase_return(&db, id, return_input(5))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let unchanged = purchase_return_service::get_purchase_return(&db, id).await.unwrap();
    assert_eq!(unchanged.document.total_amount, 20.0);
    assert_eq!(unchanged.items[0].quantity, 2);
    assert_eq!(stock_of(&db, m).await, 2);
}

#[tokio::test]
async fn test_rejected_purchase_update_leaves_invoice_untouched() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", None, &["S", "M"]).await;
    let (s, m) = (product.variants[0].id, product.variants[1].id);

    let invoice_id = purchase(&db, vendor_id, vec![line(s, 5), line(m, 3)]).await;
    sales_service::create_sale(&db, sale_input(vec![(s, 4, None)]))
        .await
        .unwrap();

    // Cutting S from 5 to 2 would need 3 units back, only 1 is left
    let err = purchase_service::update_purchase(
        &db,
        invoice_id,
        PurchaseInvoiceInput {
            vendor_id,
            invoice_date: Some("2024-06-01".to_string()),
            notes: Some("should not stick".to_string()),
            items: vec![line(s, 2), line(m, 6)],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        DomainError::InsufficientStock {
            available: 1,
            requested: 3,
            ..
        }
    ));

    assert_eq!(stock_of(&db, s).await, 1);
    assert_eq!(stock_of(&db, m).await, 3);

    let invoice = purchase_service::get_purchase(&db, invoice_id).await.unwrap();
    assert_eq!(invoice.invoice.invoice_date, "2024-05-01");
    assert_eq!(invoice.invoice.notes, None);
    assert_eq!(invoice.invoice.total_amount, 80.0);
    let quantities: Vec<i32> = invoice.items.iter().map(|i| i.quantity).collect();
    assert_eq!(quantities, vec![5, 3]);
}

#[tokio::test]
async fn test_rejected_sale_update_leaves_invoice_untouched() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", None, &["M"]).await;
    let m = product.variants[0].id;
    purchase(&db, vendor_id, vec![line(m, 2)]).await;

    let sale = sales_service::create_sale(&db, sale_input(vec![(m, 1, None)]))
        .await
        .unwrap();
    assert_eq!(stock_of(&db, m).await, 1);

    let mut input = sale_input(vec![(m, 3, None)]);
    input.customer_name = Some("Someone else".to_string());
    let err = sales_service::update_sale(&db, sale.invoice.id, input)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::InsufficientStock {
            available: 1,
            requested: 2,
            ..
        }
    ));

    assert_eq!(stock_of(&db, m).await, 1);
    let stored = sales_service::get_sale(&db, sale.invoice.id).await.unwrap();
    assert_eq!(stored.invoice.customer_name.as_deref(), Some("Walk-in"));
    assert_eq!(stored.invoice.total_amount, 25.0);
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.items[0].quantity, 1);
}

#[tokio::test]
async fn test_sale_update_blocked_once_returns_exist() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let product = create_product(&db, vendor_id, "ACM-0001", None, &["M"]).await;
    let m = product.variants[0].id;
    purchase(&db, vendor_id, vec![line(m, 3)]).await;

    let sale = sales_service::create_sale(&db, sale_input(vec![(m, 2, None)]))
        .await
        .unwrap();
    sales_return_service::create_sales_return(
        &db,
        SalesReturnInput {
            sales_invoice_id: sale.invoice.id,
            return_date: None,
            notes: None,
            items: vec![ReturnLineInput {
                sales_item_id: sale.items[0].id,
                quantity: 1,
            }],
        },
    )
    .await
    .unwrap();
    assert_eq!(stock_of(&db, m).await, 2);

    let err = sales_service::update_sale(&db, sale.invoice.id, sale_input(vec![(m, 1, None)]))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));
    assert_eq!(stock_of(&db, m).await, 2);
}

#[tokio::test]
async fn test_vendor_delete_blocked_by_products_and_documents() {
    let db = setup_test_db().await;
    let acme = create_vendor(&db, "Acme", "ACM").await;
    let other = create_vendor(&db, "Other", "OTH").await;
    let product = create_product(&db, acme, "ACM-0001", None, &["M"]).await;
    purchase(&db, acme, vec![line(product.variants[0].id, 1)]).await;

    let vendors = SeaOrmVendorRepository::new(db.clone());
    let err = vendors.delete(acme).await.unwrap_err();
    match err {
        DomainError::Conflict(msg) => assert!(msg.contains("products")),
        unexpected => panic!("unexpected error: {:?}", unexpected),
    }

    // Move the product away; the purchase invoice still points at Acme
    SeaOrmProductRepository::new(db.clone())
        .update(
            product.id,
            ProductInput {
                vendor_id: other,
                code: "ACM-0001".to_string(),
                description: "Moved".to_string(),
                buying_price: 10.0,
                selling_price: 25.0,
                discount_limit: None,
                is_active: None,
                season: None,
                variants: vec![VariantInput {
                    id: Some(product.variants[0].id),
                    color: "blue".to_string(),
                    size: "M".to_string(),
                }],
            },
        )
        .await
        .unwrap();

    let err = vendors.delete(acme).await.unwrap_err();
    match err {
        DomainError::Conflict(msg) => assert!(msg.contains("purchase documents")),
        unexpected => panic!("unexpected error: {:?}", unexpected),
    }

    // A vendor with no history goes away
    let spare = create_vendor(&db, "Spare", "SPR").await;
    vendors.delete(spare).await.unwrap();
    assert!(vendors.find_by_id(spare).await.unwrap().is_none());
}

#[tokio::test]
async fn test_product_update_can_swap_variant_attributes() {
    let db = setup_test_db().await;
    let vendor_id = create_vendor(&db, "Acme", "ACM").await;
    let products = SeaOrmProductRepository::new(db.clone());

    let input = |variants: Vec<VariantInput>| ProductInput {
        vendor_id,
        code: "ACM-0001".to_string(),
        description: "Polo".to_string(),
        buying_price: 10.0,
        selling_price: 25.0,
        discount_limit: None,
        is_active: None,
        season: None,
        variants,
    };
    let variant = |id: Option<i32>, color: &str| VariantInput {
        id,
        color: color.to_string(),
        size: "S".to_string(),
    };

    let product = products
        .create(input(vec![variant(None, "blue"), variant(None, "red")]))
        .await
        .unwrap();
    let (blue, red) = (product.variants[0].id, product.variants[1].id);
    purchase(&db, vendor_id, vec![line(blue, 2)]).await;

    let updated = products
        .update(
            product.id,
            input(vec![variant(Some(blue), "red"), variant(Some(red), "blue")]),
        )
        .await
        .unwrap();

    let by_id = |id: i32| {
        updated
            .variants
            .iter()
            .find(|v| v.id == id)
            .expect("variant kept")
            .clone()
    };
    assert_eq!(by_id(blue).color, "red");
    assert_eq!(by_id(blue).stock, 2);
    assert_eq!(by_id(red).color, "blue");
    assert_eq!(by_id(red).stock, 0);
}
