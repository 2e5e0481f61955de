use crate::auth::AuthRouterExt;
use crate::handlers::common::{
    created_response, map_service_error, message_response, success_response, validate_input,
    ApiJson, ApiPath,
};
use crate::{errors::ApiError, services::commerce::CategoryInput, AppState};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use uuid::Uuid;

/// Creates the router for category endpoints
pub fn categories_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_categories))
        .route("/:id", get(get_category));

    let admin = Router::new()
        .route("/", post(create_category))
        .route("/:id", put(update_category))
        .route("/:id", delete(delete_category))
        .with_admin();

    public.merge(admin)
}

async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .services
        .category
        .list_categories()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(categories))
}

async fn get_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .services
        .category
        .get_category(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(category))
}

async fn create_category(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let category = state
        .services
        .category
        .create_category(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(category))
}

async fn update_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let category = state
        .services
        .category
        .update_category(id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(category))
}

async fn delete_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .category
        .delete_category(id)
        .await
        .map_err(map_service_error)?;

    Ok(message_response("Category deleted successfully"))
}
