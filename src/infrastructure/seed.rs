use sea_orm::sea_query::OnConflict;
use sea_orm::*;

use crate::auth::{ROLE_ADMIN, ROLE_CASHIER, hash_password};
use crate::domain::{DomainError, ProductInput, ProductRepository, VariantInput};
use crate::infrastructure::SeaOrmProductRepository;
use crate::models::{user, vendor};
use crate::services::lines::LineInput;
use crate::services::purchase_service::{self, PurchaseInvoiceInput};

const DEMO_VENDOR: &str = "Acme Textiles";

pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DomainError> {
    // 1. Staff accounts
    for (username, password, role) in [
        ("admin", "admin123", ROLE_ADMIN),
        ("cashier", "cashier123", ROLE_CASHIER),
    ] {
        let now = chrono::Utc::now().to_rfc3339();
        let account = user::ActiveModel {
            username: Set(username.to_owned()),
            password_hash: Set(hash_password(password).map_err(DomainError::Internal)?),
            role: Set(role.to_owned()),
            is_active: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        user::Entity::insert(account)
            .on_conflict(
                OnConflict::column(user::Column::Username)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(db)
            .await?;
    }

    // 2. Catalog, only on a fresh database
    if vendor::Entity::find()
        .filter(vendor::Column::Name.eq(DEMO_VENDOR))
        .one(db)
        .await?
        .is_some()
    {
        tracing::debug!("Demo catalog already present");
        return Ok(());
    }

    let now = chrono::Utc::now().to_rfc3339();
    let acme = vendor::ActiveModel {
        name: Set(DEMO_VENDOR.to_owned()),
        name_key: Set(DEMO_VENDOR.to_lowercase()),
        code_prefix: Set("ACM".to_owned()),
        address: Set(Some("12 Mill Street".to_owned())),
        contact: Set(Some("orders@acme.example".to_owned())),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let products = SeaOrmProductRepository::new(db.clone());
    let catalog = [
        ("ACM-0001", "Linen shirt", 12.0, 29.9, &["S", "M", "L"][..]),
        ("ACM-0002", "Wool scarf", 8.5, 19.5, &["U"][..]),
    ];

    let mut opening_stock = Vec::new();
    for (code, description, buying_price, selling_price, sizes) in catalog {
        let product = products
            .create(ProductInput {
                vendor_id: acme.id,
                code: code.to_owned(),
                description: description.to_owned(),
                buying_price,
                selling_price,
                discount_limit: Some(20.0),
                is_active: Some(true),
                season: Some("all-year".to_owned()),
                variants: sizes
                    .iter()
                    .map(|size| VariantInput {
                        id: None,
                        color: "natural".to_owned(),
                        size: (*size).to_owned(),
                    })
                    .collect(),
            })
            .await?;

        opening_stock.extend(product.variants.iter().map(|v| LineInput {
            variant_id: v.id,
            quantity: 10,
            unit_price: buying_price,
        }));
    }

    // 3. Opening stock arrives through a regular purchase invoice
    purchase_service::create_purchase(
        db,
        PurchaseInvoiceInput {
            vendor_id: acme.id,
            invoice_date: None,
            notes: Some("Opening stock".to_owned()),
            items: opening_stock,
        },
    )
    .await?;

    Ok(())
}
