#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use storefront_api::{
    app_router,
    config::AppConfig,
    db,
    entities::{commerce::CategoryModel, ProductModel},
    services::commerce::{CategoryInput, CreateProductInput, RegisterInput},
    AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-4e1d9c2b7a6f5038-mnopqrst";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "hunter22";

/// Helper harness for spinning up an application backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub uploads: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let uploads = TempDir::new().expect("create upload dir");

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        // A single connection keeps every query on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.db_idle_timeout_secs = 3600;
        cfg.admin_emails = Some(ADMIN_EMAIL.to_string());
        cfg.upload_dir = uploads.path().display().to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(pool, cfg);
        let router = app_router(state.clone());

        Self {
            router,
            state,
            uploads,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.send(request).await
    }

    /// Send a fully built request.
    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Registers a user through the service layer and returns its id and token.
    pub async fn register(&self, name: &str, email: &str) -> (Uuid, String) {
        let response = self
            .state
            .services
            .customer
            .register(RegisterInput {
                name: name.to_string(),
                email: email.to_string(),
                password: PASSWORD.to_string(),
                address: Some("12 Market Street".to_string()),
                profile_pic: None,
            })
            .await
            .expect("register test user");
        (response.user.id, response.token)
    }

    pub async fn admin_token(&self) -> String {
        self.register("Admin", ADMIN_EMAIL).await.1
    }

    pub async fn seed_category(&self, name: &str) -> CategoryModel {
        self.state
            .services
            .category
            .create_category(CategoryInput {
                name: name.to_string(),
            })
            .await
            .expect("seed category")
    }

    pub async fn seed_product(
        &self,
        title: &str,
        price: Decimal,
        stock: i32,
        category_id: Uuid,
    ) -> ProductModel {
        self.state
            .services
            .product_catalog
            .create_product(CreateProductInput {
                title: title.to_string(),
                description: format!("{title} seeded for integration tests"),
                images: vec![],
                price,
                stock,
                category_id,
                rating_rate: None,
                rating_count: None,
                is_featured: false,
            })
            .await
            .expect("seed product")
    }

    pub async fn add_to_cart(&self, token: &str, product_id: Uuid, quantity: i32) {
        let response = self
            .request(
                Method::POST,
                "/api/cart",
                Some(serde_json::json!({ "productId": product_id, "quantity": quantity })),
                Some(token),
            )
            .await;
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    pub async fn checkout(&self, token: &str) -> axum::response::Response {
        self.request(
            Method::POST,
            "/api/order/checkout",
            Some(serde_json::json!({ "payment": "card", "transactionId": "tx-42" })),
            Some(token),
        )
        .await
    }

    pub async fn stock_of(&self, product_id: Uuid) -> i32 {
        self.state
            .services
            .product_catalog
            .get_product(product_id)
            .await
            .expect("product exists")
            .product
            .stock
    }
}

/// Reads the full response body as JSON.
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}

/// Parses a decimal that was serialized as a string or number.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}
