use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::auth::login,
        api::vendors::list_vendors,
        api::vendors::create_vendor,
        api::products::list_products,
        api::products::create_product,
        api::purchases::create_purchase,
        api::purchases::delete_purchase,
        api::sales::create_sale,
        api::sales::create_sales_return,
        api::statistics::sales_statistics,
    ),
    tags(
        (name = "shopkeeper", description = "Shopkeeper inventory and point-of-sale API")
    )
)]
pub struct ApiDoc;
