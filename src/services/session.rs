//! Email/password login and the session token pair.
//!
//! - Access token: HS256 JWT in the `shop_session` HttpOnly cookie
//! - Refresh token: opaque token in the `shop_refresh` HttpOnly cookie, SHA-256 hashed in DB
//!
//! Endpoints:
//! 1. POST /auth/login: verify email + password, issue token pair
//! 2. POST /auth/refresh: rotate the refresh token, issue a new pair
//! 3. GET /auth/me: current user from the access token, or `{"user": null}`
//! 4. POST /auth/logout: revoke the refresh token, clear both cookies

use actix_web::cookie::{Cookie, SameSite};
use actix_web::{HttpRequest, HttpResponse, HttpResponseBuilder, get, post, web};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::config::{Config, SessionSettings};
use crate::db::{DbPool, profiles, refresh_tokens, users};
use crate::error::{AppError, AppResult};
use crate::models::user::{LoginRequest, SessionClaims, User, UserResponse};
use crate::services::password;

/// Access token cookie name (short-lived JWT).
pub const ACCESS_COOKIE: &str = "shop_session";
/// Refresh token cookie name (long-lived opaque token).
pub const REFRESH_COOKIE: &str = "shop_refresh";
/// Session JWT issuer.
pub const SESSION_ISSUER: &str = "shop-identity";

const LOGIN_FAILED: &str = "Invalid email or password";

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(login)
        .service(refresh)
        .service(get_current_user)
        .service(logout);
}

/// Log in with email and password.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookies set", body = UserResponse),
        (status = 401, description = "Wrong credentials or inactive account", body = crate::error::ErrorResponse)
    )
)]
#[post("/auth/login")]
pub async fn login(
    req: HttpRequest,
    body: web::Json<LoginRequest>,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let db = pool.connection();
    let user = users::find_by_email(db, &body.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(LOGIN_FAILED.to_string()))?;

    let verified = user
        .password_hash
        .as_deref()
        .is_some_and(|hash| password::verify_password(&body.password, hash));
    if !verified {
        warn!("Failed password login for user {}", user.id);
        return Err(AppError::Unauthorized(LOGIN_FAILED.to_string()));
    }
    if !user.is_active {
        return Err(AppError::Unauthorized("This account is inactive".to_string()));
    }

    record_login(&pool, &user, &req).await?;
    info!("Password login: user {}", user.id);

    let mut response = HttpResponse::Ok();
    issue_token_pair(&mut response, &user, &config, &pool).await?;
    Ok(response.json(UserResponse::from(user)))
}

/// Rotate the refresh token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    responses(
        (status = 200, description = "New token pair issued"),
        (status = 401, description = "Missing, expired or reused refresh token", body = crate::error::ErrorResponse)
    )
)]
#[post("/auth/refresh")]
pub async fn refresh(
    req: HttpRequest,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let raw = req
        .cookie(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("No refresh token".to_string()))?;

    let user_id = refresh_tokens::consume(pool.connection(), &refresh_tokens::hash_token(&raw))
        .await?
        .ok_or_else(|| {
            warn!("Refresh: invalid, expired or already used refresh token");
            AppError::Unauthorized("Invalid refresh token".to_string())
        })?;

    let user = users::find_by_id(pool.connection(), user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let mut response = HttpResponse::Ok();
    issue_token_pair(&mut response, &user, &config, &pool).await?;
    Ok(response.json(serde_json::json!({ "message": "Session refreshed" })))
}

/// Current user from the access token.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses((status = 200, description = "`{\"user\": ...}` or `{\"user\": null}`"))
)]
#[get("/auth/me")]
pub async fn get_current_user(
    req: HttpRequest,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let anonymous = || HttpResponse::Ok().json(serde_json::json!({ "user": null }));

    let Some(cookie) = req.cookie(ACCESS_COOKIE) else {
        return Ok(anonymous());
    };
    let Ok(claims) = verify_session_token(cookie.value(), &config.session.secret) else {
        return Ok(anonymous());
    };
    let Ok(user_id) = uuid::Uuid::parse_str(&claims.user_id) else {
        return Ok(anonymous());
    };

    match users::find_by_id(pool.connection(), user_id).await? {
        Some(u) if u.is_active => {
            let response: UserResponse = u.into();
            Ok(HttpResponse::Ok().json(serde_json::json!({ "user": response })))
        }
        _ => Ok(anonymous()),
    }
}

/// Revoke the refresh token and clear both cookies.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Logged out"))
)]
#[post("/auth/logout")]
pub async fn logout(
    req: HttpRequest,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    if let Some(cookie) = req.cookie(REFRESH_COOKIE) {
        let hash = refresh_tokens::hash_token(cookie.value());
        if let Err(e) = refresh_tokens::revoke_by_hash(pool.connection(), &hash).await {
            warn!("Logout: failed to revoke refresh token: {}", e);
        }
    }

    let secure = config.environment.is_production();
    Ok(HttpResponse::Ok()
        .cookie(removal_cookie(ACCESS_COOKIE, secure))
        .cookie(removal_cookie(REFRESH_COOKIE, secure))
        .json(serde_json::json!({ "message": "Logged out" })))
}

/// Update `last_login` and the profile's last-seen address.
pub async fn record_login(pool: &DbPool, user: &User, req: &HttpRequest) -> AppResult<()> {
    users::touch_last_login(pool.connection(), user.id).await?;

    if let Some(ip) = client_ip(req) {
        let (profile, _) = profiles::get_or_create(pool.connection(), user.id).await?;
        profiles::set_ip_address(pool.connection(), profile.id, &ip).await?;
    }
    Ok(())
}

/// Socket peer address. Forwarding headers are client-controlled and ignored.
fn client_ip(req: &HttpRequest) -> Option<String> {
    req.peer_addr().map(|addr| addr.ip().to_string())
}

/// Attach a fresh access + refresh cookie pair to a response.
pub async fn issue_token_pair(
    response: &mut HttpResponseBuilder,
    user: &User,
    config: &Config,
    pool: &DbPool,
) -> AppResult<()> {
    let access_token = create_access_token(user, &config.session)?;

    let raw_refresh = refresh_tokens::generate_token();
    refresh_tokens::insert(
        pool.connection(),
        user.id,
        &refresh_tokens::hash_token(&raw_refresh),
        config.session.refresh_token_ttl_secs,
    )
    .await?;

    let secure = config.environment.is_production();

    let mut access_cookie = Cookie::new(ACCESS_COOKIE, access_token);
    access_cookie.set_path("/");
    access_cookie.set_http_only(true);
    access_cookie.set_same_site(SameSite::Lax);
    access_cookie.set_secure(secure);

    let mut refresh_cookie = Cookie::new(REFRESH_COOKIE, raw_refresh);
    refresh_cookie.set_path("/");
    refresh_cookie.set_http_only(true);
    refresh_cookie.set_same_site(SameSite::Strict);
    refresh_cookie.set_secure(secure);

    response.cookie(access_cookie);
    response.cookie(refresh_cookie);
    Ok(())
}

/// An expired, empty cookie that makes the browser drop `name`.
pub fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, "");
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(secure);
    cookie.make_removal();
    cookie
}

pub fn create_access_token(user: &User, settings: &SessionSettings) -> AppResult<String> {
    let now = chrono::Utc::now();
    let exp = now + chrono::Duration::seconds(settings.access_token_ttl_secs as i64);

    let claims = SessionClaims {
        sub: user.id.to_string(),
        iss: SESSION_ISSUER.to_string(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
        user_id: user.id.to_string(),
        email: user.email.clone(),
    };

    let key = EncodingKey::from_secret(settings.secret.expose_secret().as_bytes());
    encode(&Header::default(), &claims, &key)
        .map_err(|e| AppError::InvalidInput(format!("Failed to create access token: {}", e)))
}

/// Verify an access token JWT and return its claims.
pub fn verify_session_token(token: &str, secret: &SecretString) -> Result<SessionClaims, String> {
    let key = DecodingKey::from_secret(secret.expose_secret().as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[SESSION_ISSUER]);
    validation.validate_aud = false;

    decode::<SessionClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| format!("Invalid session token: {}", e))
}
