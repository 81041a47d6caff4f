//! Admin screens for users: list with search and filters, fieldset detail,
//! add form, change form, password form and delete.

use actix_web::{HttpResponse, delete, get, post, put, web};
use sea_orm::TransactionTrait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AdminAuth;
use crate::db::users::UserChanges;
use crate::db::{DbPool, groups, profiles, refresh_tokens, users};
use crate::error::{AppError, AppResult};
use crate::models::admin::{
    AdminCreateUserRequest, AdminUpdateUserRequest, MessageResponse, SetPasswordRequest,
    UserDetail, UserListItem, UserListQuery, UserListResponse, clean_password_pair,
};
use crate::models::user::{ExtraUserFields, User, UserUpdateForm};
use crate::models::{Pagination, PaginationParams};
use crate::services::storage::AvatarStore;
use crate::services::{password, permissions, user_manager};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_users)
        .service(create_user)
        .service(get_user)
        .service(update_user)
        .service(set_user_password)
        .service(delete_user);
}

fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidInput(format!("Invalid user id: {}", raw)))
}

async fn load_user(pool: &DbPool, id: Uuid) -> AppResult<User> {
    users::find_by_id(pool.connection(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
}

async fn user_detail(pool: &DbPool, user: User) -> AppResult<UserDetail> {
    let user_groups = groups::groups_for_user(pool.connection(), user.id).await?;
    let user_permissions = groups::permissions_for_user(pool.connection(), user.id).await?;
    Ok(UserDetail::new(user, user_groups, user_permissions))
}

/// Refuse changes that would leave no active superuser.
async fn guard_last_superuser(pool: &DbPool, target: &User, remains_superuser: bool) -> AppResult<()> {
    if !(target.is_superuser && target.is_active) || remains_superuser {
        return Ok(());
    }
    if users::count_active_superusers(pool.connection()).await? <= 1 {
        return Err(AppError::Conflict(
            "Cannot remove the last active superuser".to_string(),
        ));
    }
    Ok(())
}

/// User list: search by email or name, filter by flags.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "Admin",
    params(UserListQuery),
    responses(
        (status = 200, description = "Users", body = UserListResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 403, description = "Missing permission", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[get("/admin/users")]
pub async fn list_users(
    auth: AdminAuth,
    query: web::Query<UserListQuery>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    auth.require(permissions::VIEW_USER)?;

    let (rows, total) = users::list(pool.connection(), &query).await?;
    let params = PaginationParams::new(query.page, query.limit);

    Ok(HttpResponse::Ok().json(UserListResponse {
        users: rows.into_iter().map(UserListItem::from).collect(),
        pagination: Pagination::new(params.page(), params.clamped_limit(), total),
    }))
}

/// Add form: email plus a matching password pair.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    tag = "Admin",
    request_body = AdminCreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserDetail),
        (status = 400, description = "Invalid email or password pair", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[post("/admin/users")]
pub async fn create_user(
    auth: AdminAuth,
    body: web::Json<AdminCreateUserRequest>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    auth.require(permissions::ADD_USER)?;
    clean_password_pair(&body.password1, &body.password2)?;

    let user = user_manager::create_user(
        pool.connection(),
        Some(body.email.as_str()),
        Some(body.password1.as_str()),
        ExtraUserFields::default(),
    )
    .await?;
    profiles::get_or_create(pool.connection(), user.id).await?;

    info!("Admin {} created user {} ({})", auth.actor(), user.id, user.email);
    Ok(HttpResponse::Created().json(user_detail(&pool, user).await?))
}

/// Detail screen grouped into fieldsets.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "User UUID")),
    responses(
        (status = 200, description = "User detail", body = UserDetail),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[get("/admin/users/{id}")]
pub async fn get_user(
    auth: AdminAuth,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    auth.require(permissions::VIEW_USER)?;
    let user = load_user(&pool, parse_id(&path)?).await?;
    Ok(HttpResponse::Ok().json(user_detail(&pool, user).await?))
}

/// Change form. Group and permission lists replace the current ones.
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "User UUID")),
    request_body = AdminUpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserDetail),
        (status = 400, description = "Invalid field or unknown group/permission", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Email/username taken, or last superuser", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[put("/admin/users/{id}")]
pub async fn update_user(
    auth: AdminAuth,
    path: web::Path<String>,
    body: web::Json<AdminUpdateUserRequest>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    auth.require(permissions::CHANGE_USER)?;
    let id = parse_id(&path)?;
    let target = load_user(&pool, id).await?;
    let body = body.into_inner();

    let form = UserUpdateForm {
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email,
        username: body.username,
    }
    .clean()?;

    let db = pool.connection();
    if users::email_taken(db, &form.email, Some(id)).await? {
        return Err(AppError::Conflict(
            "User with this email address already exists".to_string(),
        ));
    }
    if users::username_exists(db, &form.username, Some(id)).await? {
        return Err(AppError::Conflict(
            "A user with that username already exists".to_string(),
        ));
    }
    groups::ensure_groups_exist(db, &body.groups).await?;
    groups::ensure_permissions_exist(db, &body.user_permissions).await?;
    guard_last_superuser(&pool, &target, body.is_superuser && body.is_active).await?;

    let txn = db.begin().await?;
    let updated = users::update(
        &txn,
        id,
        UserChanges {
            email: form.email,
            username: form.username,
            first_name: form.first_name,
            last_name: form.last_name,
            is_staff: body.is_staff,
            is_superuser: body.is_superuser,
            is_active: body.is_active,
        },
    )
    .await?;
    groups::set_user_groups(&txn, id, &body.groups).await?;
    groups::set_user_permissions(&txn, id, &body.user_permissions).await?;
    txn.commit().await?;

    if target.is_active && !updated.is_active {
        let revoked = refresh_tokens::revoke_all_for_user(db, id).await?;
        info!("Deactivated user {}; revoked {} refresh tokens", id, revoked);
    }

    info!("Admin {} updated user {}", auth.actor(), id);
    Ok(HttpResponse::Ok().json(user_detail(&pool, updated).await?))
}

/// Set a new password. Existing sessions of the user are revoked.
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/password",
    tag = "Admin",
    params(("id" = String, Path, description = "User UUID")),
    request_body = SetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Password pair mismatch or too short", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[put("/admin/users/{id}/password")]
pub async fn set_user_password(
    auth: AdminAuth,
    path: web::Path<String>,
    body: web::Json<SetPasswordRequest>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    auth.require(permissions::CHANGE_USER)?;
    let id = parse_id(&path)?;
    load_user(&pool, id).await?;
    clean_password_pair(&body.password1, &body.password2)?;

    let hash = password::hash_password(&body.password1)?;
    users::set_password_hash(pool.connection(), id, Some(hash)).await?;
    refresh_tokens::revoke_all_for_user(pool.connection(), id).await?;

    info!("Admin {} changed the password of user {}", auth.actor(), id);
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Password changed successfully".to_string(),
        id: id.to_string(),
    }))
}

/// Delete a user. Profile, wishlist, links and tokens cascade.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "User UUID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Last active superuser", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[delete("/admin/users/{id}")]
pub async fn delete_user(
    auth: AdminAuth,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
    store: web::Data<dyn AvatarStore>,
) -> AppResult<HttpResponse> {
    auth.require(permissions::DELETE_USER)?;
    let id = parse_id(&path)?;
    let target = load_user(&pool, id).await?;
    guard_last_superuser(&pool, &target, false).await?;

    let profile = profiles::find_by_user(pool.connection(), id).await?;
    if !users::delete(pool.connection(), id).await? {
        return Err(AppError::NotFound("User".to_string()));
    }

    if let Some(profile) = profile.filter(|p| p.has_custom_image()) {
        if let Err(e) = store.delete(&profile.image).await {
            warn!("Failed to delete avatar of deleted user {}: {}", id, e);
        }
    }

    info!("Admin {} deleted user {} ({})", auth.actor(), id, target.email);
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: format!("{} deleted", target),
        id: id.to_string(),
    }))
}
