mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::services::commerce::UpdateProductInput;

#[tokio::test]
async fn checkout_creates_order_and_decrements_stock() {
    let app = TestApp::new().await;
    let (user_id, token) = app.register("Ann", "ann@example.com").await;
    let misc = app.seed_category("Misc").await;
    let a = app.seed_product("Alpha", dec!(10), 5, misc.id).await;
    let b = app.seed_product("Beta", dec!(5), 5, misc.id).await;

    app.add_to_cart(&token, a.id, 2).await;
    app.add_to_cart(&token, b.id, 1).await;

    let response = app.checkout(&token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = body_json(response).await;
    assert_eq!(decimal(&order["total"]), dec!(25));
    assert_eq!(order["status"], "pending");
    assert_eq!(order["userId"], json!(user_id));
    assert_eq!(order["payment"], "card");
    assert_eq!(order["transactionId"], "tx-42");
    let lines = order["products"].as_array().expect("lines");
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["product"], json!(a.id));
    assert_eq!(lines[0]["quantity"], 2);

    assert_eq!(app.stock_of(a.id).await, 3);
    assert_eq!(app.stock_of(b.id).await, 4);

    let cart = app.request(Method::GET, "/api/cart", None, Some(&token)).await;
    assert_eq!(cart.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn insufficient_stock_leaves_everything_untouched() {
    let app = TestApp::new().await;
    let (_, token) = app.register("Ann", "ann@example.com").await;
    let misc = app.seed_category("Misc").await;
    let a = app.seed_product("Alpha", dec!(10), 1, misc.id).await;
    let b = app.seed_product("Beta", dec!(5), 5, misc.id).await;

    app.add_to_cart(&token, b.id, 1).await;
    app.add_to_cart(&token, a.id, 2).await;

    let response = app.checkout(&token).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(response).await["message"],
        "Insufficient stock for product: Alpha"
    );

    assert_eq!(app.stock_of(a.id).await, 1);
    assert_eq!(app.stock_of(b.id).await, 5);

    let cart = body_json(app.request(Method::GET, "/api/cart", None, Some(&token)).await).await;
    assert_eq!(cart.as_array().map(Vec::len), Some(2));

    let orders = body_json(app.request(Method::GET, "/api/order", None, Some(&token)).await).await;
    assert_eq!(orders, json!([]));
}

#[tokio::test]
async fn empty_or_missing_cart_cannot_check_out() {
    let app = TestApp::new().await;
    let (_, token) = app.register("Ann", "ann@example.com").await;
    let misc = app.seed_category("Misc").await;
    let a = app.seed_product("Alpha", dec!(10), 5, misc.id).await;

    let missing = app.checkout(&token).await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(missing).await["message"],
        "Cart is empty. Cannot proceed to checkout."
    );

    app.add_to_cart(&token, a.id, 1).await;
    app.request(
        Method::DELETE,
        &format!("/api/cart/{}", a.id),
        None,
        Some(&token),
    )
    .await;

    let emptied = app.checkout(&token).await;
    assert_eq!(emptied.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn payment_details_are_required() {
    let app = TestApp::new().await;
    let (_, token) = app.register("Ann", "ann@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/api/order/checkout",
            Some(json!({ "payment": "", "transactionId": "tx-1" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_keeps_cart_price_snapshot() {
    let app = TestApp::new().await;
    let (_, token) = app.register("Ann", "ann@example.com").await;
    let misc = app.seed_category("Misc").await;
    let a = app.seed_product("Alpha", dec!(10), 5, misc.id).await;

    app.add_to_cart(&token, a.id, 1).await;
    app.state
        .services
        .product_catalog
        .update_product(
            a.id,
            UpdateProductInput {
                price: Some(dec!(12)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let order = body_json(app.checkout(&token).await).await;
    assert_eq!(decimal(&order["total"]), dec!(10));
    assert_eq!(decimal(&order["products"][0]["price"]), dec!(10));
}

#[tokio::test]
async fn deleted_product_blocks_checkout() {
    let app = TestApp::new().await;
    let (_, token) = app.register("Ann", "ann@example.com").await;
    let misc = app.seed_category("Misc").await;
    let a = app.seed_product("Alpha", dec!(10), 5, misc.id).await;

    app.add_to_cart(&token, a.id, 1).await;
    app.state
        .services
        .product_catalog
        .delete_product(a.id)
        .await
        .unwrap();

    let response = app.checkout(&token).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn stock_changed_mid_checkout_is_a_conflict() {
    use sea_orm::ConnectionTrait;

    let app = TestApp::new().await;
    let (_, token) = app.register("Ann", "ann@example.com").await;
    let misc = app.seed_category("Misc").await;
    let a = app.seed_product("Alpha", dec!(10), 5, misc.id).await;
    app.add_to_cart(&token, a.id, 2).await;

    // Writing an order line bumps the product version inside the checkout
    // transaction, after stock was read and before it is decremented.
    app.state
        .db
        .execute_unprepared(
            "CREATE TRIGGER bump_product_version AFTER INSERT ON order_items \
             BEGIN UPDATE products SET version = version + 1 WHERE id = NEW.product_id; END",
        )
        .await
        .unwrap();

    let response = app.checkout(&token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(body_json(response).await["message"]
        .as_str()
        .is_some_and(|m| m.contains(&a.id.to_string())));

    assert_eq!(app.stock_of(a.id).await, 5);
    let product = body_json(
        app.request(Method::GET, &format!("/api/products/{}", a.id), None, None)
            .await,
    )
    .await;
    assert_eq!(product["version"], a.version);

    let orders = body_json(app.request(Method::GET, "/api/order", None, Some(&token)).await).await;
    assert_eq!(orders, json!([]));

    let cart = app.request(Method::GET, "/api/cart", None, Some(&token)).await;
    assert_eq!(cart.status(), StatusCode::OK);
    assert_eq!(body_json(cart).await[0]["quantity"], 2);
}
