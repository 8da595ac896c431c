use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use sea_orm::{EntityTrait, Set};
use serde_json::{Value, json};
use shopkeeper::api;
use shopkeeper::auth;
use shopkeeper::db;
use shopkeeper::infrastructure::AppState;
use tower::util::ServiceExt; // for `oneshot`


// Tokens are only honoured for existing, active accounts
async fn register_account(db: &sea_orm::DatabaseConnection, username: &str, role: &str) {
    let now = chrono::Utc::now().to_rfc3339();
    let account = shopkeeper::models::user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(auth::hash_password("password123").unwrap()),
        role: Set(role.to_string()),
        is_active: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    shopkeeper::models::user::Entity::insert(account)
        .exec(db)
        .await
        .expect("Failed to create account");
}

// Helper to create a test app
async fn setup_test_app() -> Router {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    register_account(&db, "test_admin", "admin").await;
    api::api_router(AppState::new(db))
}

// Helper to create a valid auth token
fn get_test_token() -> String {
    auth::create_jwt("test_admin", "admin").expect("Failed to create token")
}

fn json_request(method: &str, uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header(header::AUTHORIZATION, format!("Bearer {}", get_test_token()))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header(header::AUTHORIZATION, format!("Bearer {}", get_test_token()))
        .body(Body::empty())
        .unwrap()
}

async fn error_message(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], false);
    json["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_unknown_documents_are_not_found() {
    let app = setup_test_app().await;

    for uri in [
        "/vendors/999",
        "/products/999",
        "/purchases/999",
        "/purchase-returns/999",
        "/sales/999",
        "/sales-returns/999",
    ] {
        let response = app.clone().oneshot(empty_request("GET", uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/sales/999"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Product for a vendor that does not exist
    let payload = json!({
        "vendor_id": 42,
        "code": "X-1",
        "description": "Ghost",
        "buying_price": 1.0,
        "selling_price": 2.0
    });
    let response = app
        .oneshot(json_request("POST", "/products", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_vendor_name_is_a_conflict() {
    let app = setup_test_app().await;
    let payload = json!({ "name": "Acme", "code_prefix": "ACM" });

    let response = app
        .clone()
        .oneshot(json_request("POST", "/vendors", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let payload = json!({ "name": "  acme ", "code_prefix": "AC2" });
    let response = app
        .oneshot(json_request("POST", "/vendors", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(error_message(response).await.to_lowercase().contains("acme"));
}

#[tokio::test]
async fn test_vendor_names_fold_non_ascii_case() {
    let app = setup_test_app().await;

    let cases = [
        ("POST", "/vendors", "Élan", "ELA", StatusCode::CREATED),
        ("POST", "/vendors", "élan", "EL2", StatusCode::CONFLICT),
        ("POST", "/vendors", "Öko", "OKO", StatusCode::CREATED),
        // Renaming another vendor onto the same name is refused too
        ("PUT", "/vendors/2", "ÉLAN", "OKO", StatusCode::CONFLICT),
    ];

    for (method, uri, name, prefix, expected) in cases {
        let payload = json!({ "name": name, "code_prefix": prefix });
        let response = app
            .clone()
            .oneshot(json_request(method, uri, &payload))
            .await
            .unwrap();
        assert_eq!(response.status(), expected, "{} {}", method, name);
    }
}

#[tokio::test]
async fn test_duplicate_product_code_is_a_conflict() {
    let app = setup_test_app().await;
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/vendors",
            &json!({ "name": "Acme", "code_prefix": "ACM" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let product = json!({
        "vendor_id": 1,
        "code": "acm-0001",
        "description": "Shirt",
        "buying_price": 5.0,
        "selling_price": 9.0
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/products", &product))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(json_request("POST", "/products", &product))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_payloads_are_bad_requests() {
    let app = setup_test_app().await;

    let cases = [
        ("/vendors", json!({ "name": "   ", "code_prefix": "ACM" })),
        ("/vendors", json!({ "name": "Acme", "code_prefix": "A-C" })),
        ("/sales", json!({ "items": [] })),
        (
            "/sales",
            json!({ "payment_method": "barter", "items": [{ "variant_id": 1, "quantity": 1 }] }),
        ),
        (
            "/purchases",
            json!({ "vendor_id": 1, "invoice_date": "01/02/2024", "items": [{ "variant_id": 1, "quantity": 1, "unit_price": 1.0 }] }),
        ),
        (
            "/purchases",
            json!({ "vendor_id": 1, "items": [{ "variant_id": 1, "quantity": 0, "unit_price": 1.0 }] }),
        ),
    ];

    for (uri, payload) in cases {
        let response = app
            .clone()
            .oneshot(json_request("POST", uri, &payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{} {}", uri, payload);
    }
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let app = setup_test_app().await;

    let req = Request::builder()
        .uri("/vendors")
        .header(header::AUTHORIZATION, "Bearer forged.token.value")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(error_message(response).await.contains("token"));
}
