//! Actix-web extractors for session and admin authentication.
//!
//! Both extractors load the user from the database, so deactivating an
//! account takes effect immediately rather than when its access token expires.

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use futures_util::future::LocalBoxFuture;
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::AdminKey;
use crate::config::{ADMIN_KEY_HEADER, Config};
use crate::db::{DbPool, groups, users};
use crate::error::{AppError, ErrorResponse};
use crate::models::User;
use crate::services::permissions;
use crate::services::session::{ACCESS_COOKIE, verify_session_token};

/// Extract a secret header value, wrapping it in SecretString.
fn extract_secret_header(req: &HttpRequest, header_name: &str) -> Option<SecretString> {
    req.headers()
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(|s| SecretString::from(s.to_string()))
}

/// Access token from the session cookie or an `Authorization: Bearer` header.
fn extract_access_token(req: &HttpRequest) -> Option<SecretString> {
    if let Some(cookie) = req.cookie(ACCESS_COOKIE) {
        return Some(SecretString::from(cookie.value().to_string()));
    }
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| SecretString::from(t.trim().to_string()))
}

/// Authentication error for extractors.
#[derive(Debug)]
pub struct AuthError {
    status: StatusCode,
    message: String,
}

impl AuthError {
    fn unauthorized(message: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.to_string(),
        }
    }

    fn forbidden(message: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.to_string(),
        }
    }

    fn internal(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self.status {
            StatusCode::FORBIDDEN => "FORBIDDEN",
            StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
            _ => "INTERNAL_ERROR",
        };
        HttpResponse::build(self.status).json(ErrorResponse {
            error: error.to_string(),
            message: self.message.clone(),
        })
    }
}

impl From<AppError> for AuthError {
    fn from(e: AppError) -> Self {
        tracing::error!("Authentication lookup failed: {}", e);
        Self::internal("Authentication lookup failed")
    }
}

async fn session_user(
    pool: &DbPool,
    config: &Config,
    token: &SecretString,
) -> Result<User, AuthError> {
    let claims = verify_session_token(token.expose_secret(), &config.session.secret)
        .map_err(|_| AuthError::unauthorized("Invalid or expired session"))?;
    let user_id = Uuid::parse_str(&claims.user_id)
        .map_err(|_| AuthError::unauthorized("Invalid or expired session"))?;

    users::find_by_id(pool.connection(), user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AuthError::unauthorized("Account not found or inactive"))
}

/// Extractor that requires a logged-in, active user.
pub struct SessionAuth {
    pub user: User,
}

impl FromRequest for SessionAuth {
    type Error = AuthError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let pool = req.app_data::<web::Data<DbPool>>().cloned();
        let config = req.app_data::<web::Data<Config>>().cloned();
        let token = extract_access_token(req);

        Box::pin(async move {
            let (Some(pool), Some(config)) = (pool, config) else {
                return Err(AuthError::internal("Internal configuration error"));
            };
            let token = token.ok_or_else(|| AuthError::unauthorized("Login required"))?;
            let user = session_user(&pool, &config, &token).await?;
            Ok(SessionAuth { user })
        })
    }
}

/// Who is acting on the admin screens.
#[derive(Debug)]
pub enum AdminCaller {
    /// Authenticated with the bootstrap admin key.
    Bootstrap,
    /// Active staff user with their effective permission codenames.
    Staff {
        user: User,
        permissions: BTreeSet<String>,
    },
}

/// Extractor for admin endpoints: the bootstrap key, or an active staff session.
pub struct AdminAuth {
    pub caller: AdminCaller,
}

impl AdminAuth {
    /// Fail with 403 unless the caller holds `codename`.
    pub fn require(&self, codename: &str) -> Result<(), AppError> {
        match &self.caller {
            AdminCaller::Bootstrap => Ok(()),
            AdminCaller::Staff { user, permissions: perms } => {
                if permissions::has_perm(user, perms, codename) {
                    Ok(())
                } else {
                    Err(AppError::Forbidden(format!(
                        "Missing permission '{}'",
                        codename
                    )))
                }
            }
        }
    }

    /// Acting user id, if the caller is a user.
    pub fn user_id(&self) -> Option<Uuid> {
        match &self.caller {
            AdminCaller::Bootstrap => None,
            AdminCaller::Staff { user, .. } => Some(user.id),
        }
    }

    /// Short description for audit logs.
    pub fn actor(&self) -> String {
        match &self.caller {
            AdminCaller::Bootstrap => "admin-key".to_string(),
            AdminCaller::Staff { user, .. } => user.email.clone(),
        }
    }
}

impl FromRequest for AdminAuth {
    type Error = AuthError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let pool = req.app_data::<web::Data<DbPool>>().cloned();
        let config = req.app_data::<web::Data<Config>>().cloned();
        let stored_admin_key = req.app_data::<web::Data<AdminKey>>().cloned();
        let provided_admin_key = extract_secret_header(req, ADMIN_KEY_HEADER);
        let token = extract_access_token(req);

        Box::pin(async move {
            if let (Some(provided), Some(key)) = (&provided_admin_key, &stored_admin_key) {
                if key.verify(provided.expose_secret()) {
                    return Ok(AdminAuth {
                        caller: AdminCaller::Bootstrap,
                    });
                }
                return Err(AuthError::unauthorized("Invalid admin key"));
            }

            let (Some(pool), Some(config)) = (pool, config) else {
                return Err(AuthError::internal("Internal configuration error"));
            };
            let token = token.ok_or_else(|| {
                AuthError::unauthorized("Login required. Provide a session or X-Admin-Key header.")
            })?;
            let user = session_user(&pool, &config, &token).await?;

            if !permissions::can_access_admin(&user) {
                return Err(AuthError::forbidden("Staff access required"));
            }

            let perms = if user.is_superuser {
                BTreeSet::new()
            } else {
                groups::effective_codenames(pool.connection(), user.id).await?
            };

            Ok(AdminAuth {
                caller: AdminCaller::Staff {
                    user,
                    permissions: perms,
                },
            })
        })
    }
}
