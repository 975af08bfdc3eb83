use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use pharmaconnect_backend::{
    bootstrap::build_router,
    config::{Config, StockAlertConfig},
    store::{MemoryStore, Store, StoreTx},
    test_utils::{RecordingMailer, seed_address, seed_category, seed_product, test_state},
};
use serde_json::{Value, json};
use tower::ServiceExt;

const CUSTOMER: &str = "alice@pharma.test";

fn customer() -> Vec<(&'static str, &'static str)> {
    vec![("X-User-Email", CUSTOMER)]
}

fn admin() -> Vec<(&'static str, &'static str)> {
    vec![("X-User-Email", "admin@pharma.test"), ("X-User-Roles", "ROLE_USER,ROLE_ADMIN")]
}

fn app(store: &MemoryStore, mailer: &Arc<RecordingMailer>, config: Config) -> Router {
    build_router(test_state(store.clone(), mailer.clone(), config))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn customer_routes_require_identity() {
    let store = MemoryStore::new();
    let app = app(&store, &RecordingMailer::new(), Config::default());

    let (status, body) = call(&app, Method::GET, "/api/customers/carts/my-cart", &[], None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let store = MemoryStore::new();
    let app = app(&store, &RecordingMailer::new(), Config::default());

    let (status, _) = call(&app, Method::GET, "/api/admin/dashboard", &[], None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        Method::GET,
        "/api/admin/dashboard",
        &[("X-User-Roles", "ROLE_USER")],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, Method::GET, "/api/admin/dashboard", &admin(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["productCount"], 0);
}

#[tokio::test]
async fn checkout_flow_over_http() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::new();
    let app = app(&store, &mailer, Config::default());

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/admin/categories",
        &admin(),
        Some(json!({ "categoryName": "Pain relief" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/admin/products",
        &admin(),
        Some(json!({
            "productName": "Ibuprofen 200mg",
            "quantity": 20,
            "price": 10.0,
            "discount": 10.0,
            "categoryId": category_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["specialPrice"], 9.0);
    assert_eq!(body["data"]["categoryId"], category_id);
    assert!(body["data"].get("special_price").is_none());
    assert_eq!(body["data"]["image"], "default.png");
    let product_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/public/products/keyword/IBU",
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalElements"], 1);

    let uri = format!("/api/customers/carts/products/{product_id}/quantity/3");
    let (status, body) = call(&app, Method::POST, &uri, &customer(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalPrice"], 27.0);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/customers/addresses",
        &customer(),
        Some(json!({
            "street": "12 Harbour Road",
            "city": "Colombo",
            "country": "Sri Lanka",
            "postalCode": "00300"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let address_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/customers/orders/payments/card",
        &customer(),
        Some(json!({
            "addressId": address_id,
            "pgName": "Stripe",
            "pgPaymentId": "pi_123",
            "pgStatus": "succeeded",
            "pgResponseMessage": "ok"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["order"]["totalAmount"], 27.0);
    assert_eq!(body["data"]["items"][0]["orderedProductPrice"], 9.0);
    assert_eq!(body["data"]["order"]["status"], "Order Accepted !");
    assert_eq!(body["data"]["payment"]["method"], "card");
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    let (_, body) = call(&app, Method::GET, "/api/customers/carts/my-cart", &customer(), None).await;
    assert_eq!(body["data"]["totalPrice"], 0.0);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());

    let (_, body) = call(
        &app,
        Method::GET,
        &format!("/api/public/products/{product_id}/full"),
        &[],
        None,
    )
    .await;
    assert_eq!(body["data"]["product"]["quantity"], 17);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/customers/orders/payments/card",
        &customer(),
        Some(json!({ "addressId": address_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cart is empty");

    let (_, body) = call(&app, Method::GET, "/api/admin/dashboard", &admin(), None).await;
    assert_eq!(body["data"]["totalOrders"], 1);
    assert_eq!(body["data"]["totalRevenue"], 27.0);
}

#[tokio::test]
async fn order_with_someone_elses_address_is_not_found() {
    let store = MemoryStore::new();
    let app = app(&store, &RecordingMailer::new(), Config::default());
    let category = seed_category(&store, "Vitamins").await.unwrap();
    let product = seed_product(&store, category.id, "Vitamin C", 5, 4.0).await.unwrap();
    let other = seed_address(&store, "bob@pharma.test").await.unwrap();

    let uri = format!("/api/customers/carts/products/{}/quantity/1", product.id);
    call(&app, Method::POST, &uri, &customer(), None).await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/customers/orders/payments/cash",
        &customer(),
        Some(json!({ "addressId": other.id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.find_product(product.id).await.unwrap().unwrap().quantity, 5);
}

#[tokio::test]
async fn restock_notifies_subscribers() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::new();
    let app = app(&store, &mailer, Config::default());
    let category = seed_category(&store, "Allergy").await.unwrap();
    let product = seed_product(&store, category.id, "Cetirizine", 0, 3.0).await.unwrap();

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/public/stock/subscribe",
        &[],
        Some(json!({ "productId": product.id, "email": "not-an-email" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/public/stock/subscribe",
        &[],
        Some(json!({ "productId": product.id, "email": "waiting@pharma.test" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["notified"], false);

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/admin/products/{}", product.id),
        &admin(),
        Some(json!({
            "productName": "Cetirizine",
            "quantity": 40,
            "price": 3.0,
            "categoryId": category.id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["quantity"], 40);

    let mails = mailer.sent();
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].recipients, vec!["waiting@pharma.test"]);
    assert_eq!(mails[0].subject, "Back in stock: Cetirizine");
}

#[tokio::test]
async fn low_stock_job_can_be_triggered() {
    let store = MemoryStore::new();
    let mailer = RecordingMailer::new();
    let config = Config {
        stock: StockAlertConfig {
            low_threshold: 5,
            admin_emails: vec!["stock@pharma.test".to_string()],
            ..Default::default()
        },
        ..Default::default()
    };
    let app = app(&store, &mailer, config);
    let category = seed_category(&store, "Antacids").await.unwrap();
    seed_product(&store, category.id, "Omeprazole", 2, 6.5).await.unwrap();

    let (status, body) = call(&app, Method::POST, "/api/admin/jobs/low-stock", &admin(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["alerted"], 1);
    assert_eq!(mailer.sent()[0].subject, "LOW STOCK ALERT: Omeprazole");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let store = MemoryStore::new();
    let app = app(&store, &RecordingMailer::new(), Config::default());

    let (status, body) = call(&app, Method::GET, "/api-docs/openapi.json", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "PharmaConnect API");
    assert!(body["paths"]["/api/customers/orders/payments/{paymentMethod}"].is_object());
}
