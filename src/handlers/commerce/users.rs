use crate::auth::{AuthRouterExt, AuthUser};
use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input, ApiJson,
};
use crate::{
    errors::ApiError,
    services::commerce::{LoginInput, RegisterInput},
    uploads, AppState,
};
use axum::{
    extract::{Extension, FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::path::Path;
use tracing::warn;

/// Creates the router for account endpoints
pub fn users_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login));

    let authenticated = Router::new()
        .route("/profile", get(profile))
        .with_auth();

    public.merge(authenticated)
}

/// Register a new account from JSON or a multipart form with an optional `profilePic`
async fn register(
    State(state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let (input, picture) = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        read_registration_form(multipart).await?
    } else {
        let ApiJson(input) = ApiJson::<RegisterInput>::from_request(request, &state).await?;
        (input, None)
    };

    let mut input = input.normalized();
    validate_input(&input)?;

    let upload_dir = Path::new(&state.config.upload_dir);
    if let Some((file_name, bytes)) = picture {
        let stored = uploads::save_profile_picture(upload_dir, &file_name, &bytes)
            .await
            .map_err(map_service_error)?;
        input.profile_pic = Some(stored);
    }

    let stored_pic = input.profile_pic.clone();
    match state.services.customer.register(input).await {
        Ok(response) => Ok(created_response(response)),
        Err(err) => {
            if let Some(path) = stored_pic {
                uploads::remove_upload(upload_dir, &path).await;
            }
            Err(map_service_error(err))
        }
    }
}

/// Collects text fields and the optional picture from a registration form.
async fn read_registration_form(
    mut multipart: Multipart,
) -> Result<(RegisterInput, Option<(String, Vec<u8>)>), ApiError> {
    let mut input = RegisterInput {
        name: String::new(),
        email: String::new(),
        password: String::new(),
        address: None,
        profile_pic: None,
    };
    let mut picture = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "profilePic" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            if !bytes.is_empty() {
                picture = Some((file_name, bytes.to_vec()));
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        match name.as_str() {
            "name" => input.name = value,
            "email" => input.email = value,
            "password" => input.password = value,
            "address" => input.address = Some(value).filter(|a| !a.trim().is_empty()),
            other => warn!(field = other, "ignoring unknown registration field"),
        }
    }

    Ok((input, picture))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = payload.normalized();
    validate_input(&payload)?;

    let response = state
        .services
        .customer
        .login(payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(response))
}

/// Current user's record without the password hash
async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .services
        .customer
        .profile(user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(profile))
}
