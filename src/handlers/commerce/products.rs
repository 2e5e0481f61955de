use crate::auth::AuthRouterExt;
use crate::handlers::common::{
    created_response, map_service_error, message_response, success_response, validate_input,
    ApiJson, ApiPath, ApiQuery,
};
use crate::{
    errors::ApiError,
    services::commerce::{CreateProductInput, ProductListQuery, UpdateProductInput},
    AppState,
};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

/// Creates the router for product endpoints
pub fn products_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_products))
        .route("/suggestions", get(product_suggestions))
        .route("/featured/items", get(featured_products))
        .route("/:id", get(get_product));

    let admin = Router::new()
        .route("/", post(create_product))
        .route("/:id", put(update_product))
        .route("/:id", delete(delete_product))
        .with_admin();

    public.merge(admin)
}

#[derive(Debug, Deserialize)]
struct SuggestionQuery {
    search: Option<String>,
}

/// List products with pagination, category filter and title search
async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .services
        .product_catalog
        .list_products(query)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(page))
}

async fn product_suggestions(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SuggestionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let suggestions = state
        .services
        .product_catalog
        .suggestions(query.search.as_deref())
        .await
        .map_err(map_service_error)?;

    Ok(success_response(suggestions))
}

async fn featured_products(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .product_catalog
        .featured()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(products))
}

async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .product_catalog
        .get_product(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

async fn create_product(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .product_catalog
        .create_product(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(product))
}

async fn update_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .product_catalog
        .update_product(id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

async fn delete_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .product_catalog
        .delete_product(id)
        .await
        .map_err(map_service_error)?;

    Ok(message_response("Product deleted successfully"))
}
