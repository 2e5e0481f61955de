use crate::auth::{AuthRouterExt, AuthUser};
use crate::handlers::common::{
    map_service_error, success_response, validate_input, ApiJson, ApiPath, CartMessage,
};
use crate::{
    errors::ApiError,
    services::commerce::{AddToCartInput, CartView, QuantityAdjustment},
    AppState,
};
use axum::{
    extract::{Extension, State},
    response::{IntoResponse, Response},
    routing::{delete, get, patch},
    Router,
};
use uuid::Uuid;

/// Creates the router for cart endpoints; every route acts on the caller's own cart.
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).post(add_to_cart))
        .route("/:product_id", delete(remove_from_cart))
        .route("/increase/:product_id", patch(increase_quantity))
        .route("/decrease/:product_id", patch(decrease_quantity))
        .route("/update/:kind/:product_id", patch(update_quantity))
        .with_auth()
}

fn adjusted(cart: CartView, adjustment: QuantityAdjustment) -> Response {
    let message = match adjustment {
        QuantityAdjustment::Increase => "Product quantity increased successfully!",
        QuantityAdjustment::Decrease => "Product quantity decreased successfully!",
    };
    success_response(CartMessage {
        cart,
        cart_total: None,
        message,
    })
}

/// Cart lines with product id/title/price expanded
async fn get_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let lines = state
        .services
        .cart
        .get_cart(user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(lines))
}

async fn add_to_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<AddToCartInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let cart = state
        .services
        .cart
        .add_item(user.user_id, payload)
        .await
        .map_err(map_service_error)?;

    let cart_total = cart.cart_total;
    Ok(success_response(CartMessage {
        cart,
        cart_total: Some(cart_total),
        message: "Product added to cart successfully!",
    }))
}

async fn remove_from_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(product_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .remove_item(user.user_id, product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CartMessage {
        cart,
        cart_total: None,
        message: "Product removed from cart successfully!",
    }))
}

async fn increase_quantity(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(product_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .increase_quantity(user.user_id, product_id)
        .await
        .map_err(map_service_error)?;

    Ok(adjusted(cart, QuantityAdjustment::Increase))
}

async fn decrease_quantity(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(product_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .decrease_quantity(user.user_id, product_id)
        .await
        .map_err(map_service_error)?;

    Ok(adjusted(cart, QuantityAdjustment::Decrease))
}

/// `kind` is `increase` or `decrease`
async fn update_quantity(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath((kind, product_id)): ApiPath<(String, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let adjustment = QuantityAdjustment::parse(&kind).map_err(map_service_error)?;

    let cart = state
        .services
        .cart
        .adjust_quantity(user.user_id, product_id, adjustment)
        .await
        .map_err(map_service_error)?;

    Ok(adjusted(cart, adjustment))
}
