/*!
 * # Authentication and Authorization
 *
 * HS256 JWT issuance and verification for storefront customers, plus the
 * axum middleware that resolves a bearer credential into an [`AuthUser`].
 *
 * Admin rights are carried as a flag in the token; routes that need them are
 * wrapped with [`AuthRouterExt::with_admin`].
 */

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::{config::AppConfig, entities::user, errors::ServiceError};

pub mod password;

pub use password::{hash_password, verify_password};

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller resolved from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub is_admin: bool,
    pub email: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// True when the caller owns the resource or is an admin.
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthUser {
            user_id,
            is_admin: claims.is_admin,
            email: claims.email,
        })
    }
}

/// How much of the user record a token carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScope {
    /// Id and admin flag only (issued at registration).
    Identity,
    /// Id plus a denormalized copy of the profile (issued at login).
    Profile,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            token_expiration,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            Duration::from_secs(cfg.jwt_expiration),
        )
    }
}

/// Issues and validates access tokens.
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Signs a token for `user`.
    pub fn issue_token(&self, user: &user::Model, scope: TokenScope) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let mut claims = Claims {
            sub: user.id.to_string(),
            is_admin: user.is_admin,
            name: None,
            email: None,
            address: None,
            profile_pic: None,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        if scope == TokenScope::Profile {
            claims.name = Some(user.name.clone());
            claims.email = Some(user.email.clone());
            claims.address = user.address.clone();
            claims.profile_pic = user.profile_pic.clone();
        }

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    pub fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        self.validate_token(token)?.try_into()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization token is required.")]
    MissingToken,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("Token has expired.")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Admin access required.")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::TokenExpired => {
                ServiceError::Unauthorized(err.to_string())
            }
            AuthError::InsufficientPermissions => ServiceError::Forbidden(err.to_string()),
            AuthError::TokenCreation(msg) | AuthError::InternalError(msg) => {
                ServiceError::InternalError(msg)
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

/// Pulls the credential out of `Authorization`, with or without the `Bearer ` prefix.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match value.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        // A scheme with nothing after it carries no credential.
        None if value.eq_ignore_ascii_case("bearer") => "",
        _ => value,
    };
    (!token.is_empty()).then_some(token)
}

/// Authentication middleware that extracts and validates bearer tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("Authentication service not available".to_string())
                .into_response();
        }
    };

    let user = match extract_token(request.headers()) {
        Some(token) => auth_service.authenticate(token),
        None => Err(AuthError::MissingToken),
    };

    match user {
        Ok(user) => {
            debug!(user_id = %user.user_id, "request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Rejects callers whose token does not carry the admin flag.
pub async fn admin_middleware(request: Request, next: Next) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingToken)?;

    if !user.is_admin() {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_admin(self) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    // The admin check is added first so that auth runs before it.
    fn with_admin(self) -> Self {
        self.layer(axum::middleware::from_fn(admin_middleware))
            .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "unit-test-secret-9f8e7d6c5b4a3210-abcdefghijkl".into(),
            Duration::from_secs(3600),
        ))
    }

    fn user(is_admin: bool) -> user::Model {
        let now = Utc::now();
        user::Model {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "x".into(),
            address: Some("1 Loop Rd".into()),
            profile_pic: None,
            is_admin,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn identity_token_carries_only_id_and_admin_flag() {
        let svc = service();
        let u = user(true);
        let token = svc.issue_token(&u, TokenScope::Identity).unwrap();

        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.sub, u.id.to_string());
        assert!(claims.is_admin);
        assert!(claims.email.is_none());
        assert!(claims.name.is_none());
    }

    #[test]
    fn profile_token_round_trips_into_auth_user() {
        let svc = service();
        let u = user(false);
        let token = svc.issue_token(&u, TokenScope::Profile).unwrap();

        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.address.as_deref(), Some("1 Loop Rd"));

        let auth = svc.authenticate(&token).unwrap();
        assert_eq!(auth.user_id, u.id);
        assert!(!auth.is_admin());
        assert_eq!(auth.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = AuthService::new(AuthConfig::new(
            "another-secret-0123456789abcdef-zyxwvutsrqpo".into(),
            Duration::from_secs(3600),
        ));
        let token = other.issue_token(&user(false), TokenScope::Identity).unwrap();

        assert!(matches!(
            service().validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            service().validate_token("not-a-jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn bearer_prefix_is_optional() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("abc"));
        assert_eq!(extract_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("BEARER  abc "));
        assert_eq!(extract_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer"));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn ownership_check_admits_owner_and_admin() {
        let owner = Uuid::new_v4();
        let caller = AuthUser {
            user_id: owner,
            is_admin: false,
            email: None,
        };
        assert!(caller.can_access(owner));
        assert!(!caller.can_access(Uuid::new_v4()));

        let admin = AuthUser {
            is_admin: true,
            ..caller
        };
        assert!(admin.can_access(Uuid::new_v4()));
    }

    #[test]
    fn auth_errors_map_to_401_and_403() {
        use axum::http::StatusCode;
        assert_eq!(
            ServiceError::from(AuthError::MissingToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::from(AuthError::InsufficientPermissions).status_code(),
            StatusCode::FORBIDDEN
        );
    }
}
