mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn category_writes_require_admin() {
    let app = TestApp::new().await;
    let (_, shopper) = app.register("Shopper", "shopper@example.com").await;

    let anonymous = app
        .request(Method::POST, "/api/categories", Some(json!({ "name": "Shoes" })), None)
        .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let forbidden = app
        .request(
            Method::POST,
            "/api/categories",
            Some(json!({ "name": "Shoes" })),
            Some(&shopper),
        )
        .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let admin = app.admin_token().await;
    let created = app
        .request(
            Method::POST,
            "/api/categories",
            Some(json!({ "name": "Shoes" })),
            Some(&admin),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    assert_eq!(body_json(created).await["name"], "Shoes");
}

#[tokio::test]
async fn category_crud_round() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let category = app.seed_category("Hats").await;

    let list = app.request(Method::GET, "/api/categories", None, None).await;
    assert_eq!(list.status(), StatusCode::OK);
    assert_eq!(body_json(list).await.as_array().map(Vec::len), Some(1));

    let renamed = app
        .request(
            Method::PUT,
            &format!("/api/categories/{}", category.id),
            Some(json!({ "name": "Caps" })),
            Some(&admin),
        )
        .await;
    assert_eq!(renamed.status(), StatusCode::OK);
    assert_eq!(body_json(renamed).await["name"], "Caps");

    let deleted = app
        .request(
            Method::DELETE,
            &format!("/api/categories/{}", category.id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(
        body_json(deleted).await["message"],
        "Category deleted successfully"
    );

    let missing = app
        .request(
            Method::GET,
            &format!("/api/categories/{}", category.id),
            None,
            None,
        )
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(missing).await["message"], "Category not found");
}

#[tokio::test]
async fn product_create_checks_category() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let category = app.seed_category("Shirts").await;

    let unknown = app
        .request(
            Method::POST,
            "/api/products",
            Some(json!({
                "title": "Oxford shirt",
                "price": "25.00",
                "stock": 4,
                "category": Uuid::new_v4(),
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(unknown).await["message"], "Category not found");

    let created = app
        .request(
            Method::POST,
            "/api/products",
            Some(json!({
                "title": "Oxford shirt",
                "description": "Button-down",
                "images": ["uploads/oxford.jpg"],
                "price": "25.00",
                "stock": 4,
                "category": category.id,
                "isFeatured": true,
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = body_json(created).await;
    assert_eq!(body["title"], "Oxford shirt");
    assert_eq!(decimal(&body["price"]), dec!(25));
    assert_eq!(body["stock"], 4);
    assert_eq!(body["images"], json!(["uploads/oxford.jpg"]));

    let id = body["id"].as_str().unwrap();
    let fetched = app
        .request(Method::GET, &format!("/api/products/{id}"), None, None)
        .await;
    assert_eq!(fetched.status(), StatusCode::OK);
    let fetched = body_json(fetched).await;
    assert_eq!(fetched["category"]["name"], "Shirts");
}

#[tokio::test]
async fn listing_paginates_and_filters() {
    let app = TestApp::new().await;
    let shirts = app.seed_category("Shirts").await;
    let shoes = app.seed_category("Shoes").await;
    app.seed_product("Linen shirt", dec!(20), 3, shirts.id).await;
    app.seed_product("Flannel SHIRT", dec!(30), 3, shirts.id).await;
    app.seed_product("Running shoe", dec!(60), 3, shoes.id).await;

    let page = app
        .request(
            Method::GET,
            "/api/products?currentPage=2&productsPerPage=2",
            None,
            None,
        )
        .await;
    assert_eq!(page.status(), StatusCode::OK);
    let page = body_json(page).await;
    assert_eq!(page["currentPage"], 2);
    assert_eq!(page["productsPerPage"], 2);
    assert_eq!(page["totalProducts"], 3);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["products"].as_array().map(Vec::len), Some(1));

    let by_category = body_json(
        app.request(Method::GET, "/api/products?category=Shoes", None, None)
            .await,
    )
    .await;
    assert_eq!(by_category["totalProducts"], 1);
    assert_eq!(by_category["products"][0]["title"], "Running shoe");
    assert_eq!(by_category["products"][0]["category"]["name"], "Shoes");

    let searched = body_json(
        app.request(Method::GET, "/api/products?search=shirt", None, None)
            .await,
    )
    .await;
    assert_eq!(searched["totalProducts"], 2);

    let unknown = app
        .request(Method::GET, "/api/products?category=Gloves", None, None)
        .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
    let app = TestApp::new().await;
    let misc = app.seed_category("Misc").await;
    app.seed_product("100% cotton tee", dec!(10), 1, misc.id).await;
    app.seed_product("Wool tee", dec!(10), 1, misc.id).await;

    let found = body_json(
        app.request(Method::GET, "/api/products?search=100%25", None, None)
            .await,
    )
    .await;
    assert_eq!(found["totalProducts"], 1);

    let none = body_json(
        app.request(Method::GET, "/api/products?search=_ool", None, None)
            .await,
    )
    .await;
    assert_eq!(none["totalProducts"], 0);
}

#[tokio::test]
async fn suggestions_require_a_term() {
    let app = TestApp::new().await;
    let misc = app.seed_category("Misc").await;
    let lamp = app.seed_product("Desk lamp", dec!(15), 2, misc.id).await;
    app.seed_product("Chair", dec!(40), 2, misc.id).await;

    let missing = app
        .request(Method::GET, "/api/products/suggestions", None, None)
        .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(missing).await["message"], "Search term is required");

    let found = app
        .request(Method::GET, "/api/products/suggestions?search=LAMP", None, None)
        .await;
    assert_eq!(found.status(), StatusCode::OK);
    let found = body_json(found).await;
    assert_eq!(found, json!([{ "id": lamp.id, "title": "Desk lamp" }]));

    let nothing = body_json(
        app.request(Method::GET, "/api/products/suggestions?search=sofa", None, None)
            .await,
    )
    .await;
    assert_eq!(nothing, json!([]));
}

#[tokio::test]
async fn featured_returns_at_most_three() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let misc = app.seed_category("Misc").await;

    for n in 0..4 {
        let product = app
            .seed_product(&format!("Featured {n}"), dec!(5), 1, misc.id)
            .await;
        let response = app
            .request(
                Method::PUT,
                &format!("/api/products/{}", product.id),
                Some(json!({ "isFeatured": true })),
                Some(&admin),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    app.seed_product("Plain", dec!(5), 1, misc.id).await;

    let featured = body_json(
        app.request(Method::GET, "/api/products/featured/items", None, None)
            .await,
    )
    .await;
    let items = featured.as_array().expect("array");
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|p| p["isFeatured"] == true));
}

#[tokio::test]
async fn admin_updates_and_deletes_products() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let misc = app.seed_category("Misc").await;
    let product = app.seed_product("Mug", dec!(8), 5, misc.id).await;

    let updated = app
        .request(
            Method::PUT,
            &format!("/api/products/{}", product.id),
            Some(json!({ "price": "9.50", "stock": 12 })),
            Some(&admin),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    let updated = body_json(updated).await;
    assert_eq!(decimal(&updated["price"]), dec!(9.5));
    assert_eq!(updated["stock"], 12);
    assert_eq!(updated["title"], "Mug");
    assert_eq!(updated["version"], product.version + 1);

    let deleted = app
        .request(
            Method::DELETE,
            &format!("/api/products/{}", product.id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(
        body_json(deleted).await["message"],
        "Product deleted successfully"
    );

    let again = app
        .request(
            Method::DELETE,
            &format!("/api/products/{}", product.id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(again).await["message"], "Product not found");
}

#[tokio::test]
async fn huge_page_number_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/products?currentPage=18446744073709551615&productsPerPage=10",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Page number is too large");
}

#[tokio::test]
async fn malformed_path_and_query_are_json_errors() {
    let app = TestApp::new().await;

    let bad_id = app
        .request(Method::GET, "/api/products/not-a-uuid", None, None)
        .await;
    assert_eq!(bad_id.status(), StatusCode::BAD_REQUEST);
    assert_eq!(bad_id.headers()["content-type"], "application/json");
    assert_eq!(body_json(bad_id).await["error"], "Bad Request");

    let bad_page = app
        .request(Method::GET, "/api/products?currentPage=abc", None, None)
        .await;
    assert_eq!(bad_page.status(), StatusCode::BAD_REQUEST);
    assert_eq!(bad_page.headers()["content-type"], "application/json");
    assert!(body_json(bad_page).await["message"]
        .as_str()
        .is_some_and(|m| !m.is_empty()));
}
