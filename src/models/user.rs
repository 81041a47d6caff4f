//! User models: the account record, its API views and the update form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::user_manager::{MAX_NAME_LENGTH, MAX_USERNAME_LENGTH, is_valid_email};

/// User stored in database.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Whether the account can log in with a password at all.
    pub fn has_usable_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} User", self.email)
    }
}

impl From<crate::entity::user::Model> for User {
    fn from(m: crate::entity::user::Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            username: m.username,
            first_name: m.first_name,
            last_name: m.last_name,
            password_hash: m.password_hash,
            is_staff: m.is_staff,
            is_superuser: m.is_superuser,
            is_active: m.is_active,
            last_login: m.last_login,
            date_joined: m.date_joined,
        }
    }
}

/// Optional fields accepted by user creation.
///
/// Flags left as `None` take the defaults of the creating operation
/// (regular user or superuser).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtraUserFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_active: Option<bool>,
}

/// User info response (returned by /auth/me and /account).
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id.to_string(),
            email: u.email,
            username: u.username,
            first_name: u.first_name,
            last_name: u.last_name,
            is_staff: u.is_staff,
            is_superuser: u.is_superuser,
        }
    }
}

/// Self-service account form: name, email and username.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UserUpdateForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    pub username: String,
}

impl UserUpdateForm {
    /// Field-level validation. Uniqueness is checked against the database by the caller.
    pub fn clean(self) -> AppResult<Self> {
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        let email = crate::services::user_manager::normalize_email(&self.email);
        let username = self.username.trim().to_string();

        if first_name.chars().count() > MAX_NAME_LENGTH {
            return Err(AppError::InvalidInput(format!(
                "first_name must be at most {} characters",
                MAX_NAME_LENGTH
            )));
        }
        if last_name.chars().count() > MAX_NAME_LENGTH {
            return Err(AppError::InvalidInput(format!(
                "last_name must be at most {} characters",
                MAX_NAME_LENGTH
            )));
        }
        if !is_valid_email(&email) {
            return Err(AppError::InvalidInput(
                "Enter a valid email address".to_string(),
            ));
        }
        validate_username(&username)?;

        Ok(Self {
            first_name,
            last_name,
            email,
            username,
        })
    }
}

/// Usernames: 1..=30 chars of letters, digits and `@.+-_`.
pub fn validate_username(username: &str) -> AppResult<()> {
    if username.is_empty() {
        return Err(AppError::InvalidInput("username is required".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "username must be at most {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AppError::InvalidInput(
            "username may only contain letters, digits and @/./+/-/_".to_string(),
        ));
    }
    Ok(())
}

/// Email/password login request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Session JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iss: String,
    pub exp: usize,
    pub iat: usize,
    pub user_id: String,
    pub email: String,
}
