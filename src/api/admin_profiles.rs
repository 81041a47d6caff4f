//! Admin screens for profiles, including loyalty point adjustments.

use actix_web::{HttpResponse, delete, get, post, put, web};
use tracing::info;
use uuid::Uuid;

use crate::auth::AdminAuth;
use crate::config::Config;
use crate::db::{DbPool, profiles, users};
use crate::error::{AppError, AppResult};
use crate::models::admin::{
    AdminProfileItem, AdminProfileListResponse, AdminProfileUpdate, LoyaltyAdjustRequest,
    LoyaltyBalanceResponse, MessageResponse,
};
use crate::models::{Pagination, PaginationParams, UserProfile};
use crate::services::permissions;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_profiles)
        .service(get_profile)
        .service(update_profile)
        .service(delete_profile)
        .service(adjust_loyalty_points);
}

fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| AppError::InvalidInput(format!("Invalid profile id: {}", raw)))
}

async fn profile_item(pool: &DbPool, profile: UserProfile) -> AppResult<AdminProfileItem> {
    let email = users::find_by_id(pool.connection(), profile.user_id)
        .await?
        .map(|u| u.email)
        .unwrap_or_default();
    let wishlist = profiles::wishlist(pool.connection(), profile.id).await?;
    Ok(AdminProfileItem::new(profile, &email, wishlist))
}

async fn load_profile(pool: &DbPool, id: Uuid) -> AppResult<UserProfile> {
    profiles::find_by_id(pool.connection(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile".to_string()))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/profiles",
    tag = "Admin",
    params(PaginationParams),
    responses(
        (status = 200, description = "Profiles", body = AdminProfileListResponse),
        (status = 403, description = "Missing permission", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[get("/admin/profiles")]
pub async fn list_profiles(
    auth: AdminAuth,
    query: web::Query<PaginationParams>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    auth.require(permissions::VIEW_PROFILE)?;

    let (rows, total) = profiles::list(pool.connection(), &query).await?;
    let mut items = Vec::with_capacity(rows.len());
    for (profile, email) in rows {
        let wishlist = profiles::wishlist(pool.connection(), profile.id).await?;
        items.push(AdminProfileItem::new(profile, &email, wishlist));
    }

    Ok(HttpResponse::Ok().json(AdminProfileListResponse {
        profiles: items,
        pagination: Pagination::new(query.page(), query.clamped_limit(), total),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/profiles/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "Profile UUID")),
    responses(
        (status = 200, description = "Profile", body = AdminProfileItem),
        (status = 404, description = "Profile not found", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[get("/admin/profiles/{id}")]
pub async fn get_profile(
    auth: AdminAuth,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    auth.require(permissions::VIEW_PROFILE)?;
    let profile = load_profile(&pool, parse_id(&path)?).await?;
    Ok(HttpResponse::Ok().json(profile_item(&pool, profile).await?))
}

/// Change form covering every profile field. The wishlist is replaced.
#[utoipa::path(
    put,
    path = "/api/v1/admin/profiles/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "Profile UUID")),
    request_body = AdminProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = AdminProfileItem),
        (status = 400, description = "Invalid field", body = crate::error::ErrorResponse),
        (status = 404, description = "Profile not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Shipping address already used by another profile", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[put("/admin/profiles/{id}")]
pub async fn update_profile(
    auth: AdminAuth,
    path: web::Path<String>,
    body: web::Json<AdminProfileUpdate>,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    auth.require(permissions::CHANGE_PROFILE)?;
    let id = parse_id(&path)?;
    load_profile(&pool, id).await?;

    let changes = body.clean(&config.default_phone_region)?;
    let updated = profiles::admin_update(pool.connection(), id, changes).await?;
    profiles::set_wishlist(pool.connection(), id, &body.wishlist).await?;

    info!("Admin {} updated profile {}", auth.actor(), id);
    Ok(HttpResponse::Ok().json(profile_item(&pool, updated).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/profiles/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "Profile UUID")),
    responses(
        (status = 200, description = "Profile deleted", body = MessageResponse),
        (status = 404, description = "Profile not found", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[delete("/admin/profiles/{id}")]
pub async fn delete_profile(
    auth: AdminAuth,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    auth.require(permissions::DELETE_PROFILE)?;
    let id = parse_id(&path)?;
    if !profiles::delete(pool.connection(), id).await? {
        return Err(AppError::NotFound("Profile".to_string()));
    }

    info!("Admin {} deleted profile {}", auth.actor(), id);
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Profile deleted".to_string(),
        id: id.to_string(),
    }))
}

/// Award (positive) or redeem (negative) points. The balance stops at zero.
#[utoipa::path(
    post,
    path = "/api/v1/admin/profiles/{id}/loyalty-points",
    tag = "Admin",
    params(("id" = String, Path, description = "Profile UUID")),
    request_body = LoyaltyAdjustRequest,
    responses(
        (status = 200, description = "New balance", body = LoyaltyBalanceResponse),
        (status = 404, description = "Profile not found", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[post("/admin/profiles/{id}/loyalty-points")]
pub async fn adjust_loyalty_points(
    auth: AdminAuth,
    path: web::Path<String>,
    body: web::Json<LoyaltyAdjustRequest>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    auth.require(permissions::CHANGE_PROFILE)?;
    let id = parse_id(&path)?;
    let balance = profiles::adjust_loyalty(pool.connection(), id, body.delta).await?;

    info!(
        "Admin {} adjusted loyalty points of profile {} by {} (balance {})",
        auth.actor(),
        id,
        body.delta,
        balance
    );
    Ok(HttpResponse::Ok().json(LoyaltyBalanceResponse {
        profile_id: id.to_string(),
        loyalty_points: balance,
    }))
}
