use crate::{
    auth::{hash_password, verify_password, AuthService, TokenScope},
    config::AppConfig,
    entities::{user, User, UserModel},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Customer account service: registration, login and profile lookup.
#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
    config: Arc<AppConfig>,
}

impl CustomerService {
    pub fn new(db: Arc<DatabaseConnection>, auth: Arc<AuthService>, config: Arc<AppConfig>) -> Self {
        Self { db, auth, config }
    }

    /// Creates an account and returns it with a freshly issued token.
    ///
    /// The token carries only the user id and admin flag. Admin rights are
    /// granted when the email is listed in `admin_emails`.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthResponse, ServiceError> {
        let input = input.normalized();
        input.validate()?;
        let email = input.email.clone();

        let existing = User::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            warn!("Registration rejected: email already registered");
            return Err(ServiceError::Conflict(
                "Email already registered.".to_string(),
            ));
        }

        let now = Utc::now();
        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            is_admin: Set(self.config.is_admin_email(&email)),
            email: Set(email),
            password_hash: Set(hash_password(&input.password)?),
            address: Set(input.address),
            profile_pic: Set(input.profile_pic),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        let token = self.auth.issue_token(&user, TokenScope::Identity)?;

        info!(user_id = %user.id, is_admin = user.is_admin, "Registered user");
        Ok(AuthResponse {
            token,
            user: UserProfile::from(user),
        })
    }

    /// Verifies credentials and returns a token carrying the profile fields.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthResponse, ServiceError> {
        let input = input.normalized();
        input.validate()?;
        let email = input.email.clone();

        let user = User::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("User not found.".to_string()))?;

        if !verify_password(&user.password_hash, &input.password)? {
            warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(ServiceError::Unauthorized(
                "You have entered wrong credentials.".to_string(),
            ));
        }

        let token = self.auth.issue_token(&user, TokenScope::Profile)?;

        info!(user_id = %user.id, "User logged in");
        Ok(AuthResponse {
            token,
            user: UserProfile::from(user),
        })
    }

    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: Uuid) -> Result<UserModel, ServiceError> {
        User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration fields. `profile_pic` is the stored upload path, set by the handler.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, skip_deserializing)]
    pub profile_pic: Option<String>,
}

impl RegisterInput {
    /// Trims and lowercases the email; validation runs on the result.
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl LoginInput {
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self
    }
}

/// Public part of a user record returned next to a token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub profile_pic: Option<String>,
    pub is_admin: bool,
}

impl From<UserModel> for UserProfile {
    fn from(u: UserModel) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            address: u.address,
            profile_pic: u.profile_pic,
            is_admin: u.is_admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn padded_email_validates_once_normalized() {
        let input = LoginInput {
            email: "  Ada@Example.COM ".into(),
            password: "secret12".into(),
        };
        assert!(input.validate().is_err());

        let input = input.normalized();
        assert_eq!(input.email, "ada@example.com");
        assert!(input.validate().is_ok());
    }

    #[test]
    fn client_cannot_set_admin_flag_or_profile_pic() {
        let input: RegisterInput = serde_json::from_str(
            r#"{"name":"Ada","email":"ada@example.com","password":"secret12",
                "isAdmin":true,"profilePic":"/etc/passwd"}"#,
        )
        .unwrap();
        assert!(input.profile_pic.is_none());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn register_input_validation() {
        let input = RegisterInput {
            name: "Ada".into(),
            email: "not-an-email".into(),
            password: "123".into(),
            address: None,
            profile_pic: None,
        };
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
