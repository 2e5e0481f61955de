use crate::auth::{AuthRouterExt, AuthUser};
use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input, ApiJson, ApiPath,
};
use crate::{errors::ApiError, services::commerce::CheckoutInput, AppState};
use axum::{
    extract::{Extension, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

/// Creates the router for order endpoints
pub fn orders_routes() -> Router<AppState> {
    let customer = Router::new()
        .route("/", get(list_orders))
        .route("/checkout", post(checkout))
        .route("/detail/:order_id", get(get_order))
        .route("/cancel/:order_id", put(cancel_order))
        .with_auth();

    let admin = Router::new()
        .route("/ship/:order_id", put(ship_order))
        .route("/complete/:order_id", put(complete_order))
        .with_admin();

    customer.merge(admin)
}

/// Convert the caller's cart into a pending order
async fn checkout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<CheckoutInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let order = state
        .services
        .checkout
        .checkout(user.user_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(order))
}

async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .order
        .list_for_user(user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(orders))
}

async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(order_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .order
        .get_order(order_id, &user)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

async fn ship_order(
    State(state): State<AppState>,
    ApiPath(order_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .order_status
        .ship(order_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

async fn complete_order(
    State(state): State<AppState>,
    ApiPath(order_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .order_status
        .complete(order_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}

/// Owner or admin; restocks the ordered quantities
async fn cancel_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(order_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .order_status
        .cancel(order_id, &user)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(order))
}
