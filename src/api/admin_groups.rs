//! Admin screens for groups and the permission catalogue.

use actix_web::{HttpResponse, get, post, put, web};
use tracing::info;

use crate::auth::AdminAuth;
use crate::db::{DbPool, groups};
use crate::error::{AppError, AppResult};
use crate::models::admin::{
    CreateGroupRequest, GroupResponse, PermissionRef, SetGroupPermissionsRequest,
};
use crate::services::permissions;

const MAX_GROUP_NAME_LENGTH: usize = 150;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_groups)
        .service(create_group)
        .service(set_group_permissions)
        .service(list_permissions);
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/groups",
    tag = "Admin",
    responses((status = 200, description = "Groups", body = [GroupResponse])),
    security(("admin_key" = []), ("session" = []))
)]
#[get("/admin/groups")]
pub async fn list_groups(auth: AdminAuth, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    auth.require(permissions::VIEW_GROUP)?;
    Ok(HttpResponse::Ok().json(groups::list_groups(pool.connection()).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/groups",
    tag = "Admin",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = GroupResponse),
        (status = 400, description = "Invalid name or unknown permission", body = crate::error::ErrorResponse),
        (status = 409, description = "Group name taken", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[post("/admin/groups")]
pub async fn create_group(
    auth: AdminAuth,
    body: web::Json<CreateGroupRequest>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    auth.require(permissions::CHANGE_GROUP)?;

    let name = body.name.trim();
    if name.is_empty() || name.chars().count() > MAX_GROUP_NAME_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Group name must be 1 to {} characters",
            MAX_GROUP_NAME_LENGTH
        )));
    }

    let group = groups::create_group(pool.connection(), name, &body.permissions).await?;
    info!("Admin {} created group '{}'", auth.actor(), group.name);
    Ok(HttpResponse::Created().json(group))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/groups/{id}/permissions",
    tag = "Admin",
    params(("id" = i32, Path, description = "Group id")),
    request_body = SetGroupPermissionsRequest,
    responses(
        (status = 200, description = "Updated group", body = GroupResponse),
        (status = 400, description = "Unknown permission", body = crate::error::ErrorResponse),
        (status = 404, description = "Group not found", body = crate::error::ErrorResponse)
    ),
    security(("admin_key" = []), ("session" = []))
)]
#[put("/admin/groups/{id}/permissions")]
pub async fn set_group_permissions(
    auth: AdminAuth,
    path: web::Path<i32>,
    body: web::Json<SetGroupPermissionsRequest>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    auth.require(permissions::CHANGE_GROUP)?;
    let id = path.into_inner();
    let group = groups::set_group_permissions(pool.connection(), id, &body.permissions).await?;
    info!(
        "Admin {} set {} permission(s) on group '{}'",
        auth.actor(),
        group.permissions.len(),
        group.name
    );
    Ok(HttpResponse::Ok().json(group))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/permissions",
    tag = "Admin",
    responses((status = 200, description = "Permissions", body = [PermissionRef])),
    security(("admin_key" = []), ("session" = []))
)]
#[get("/admin/permissions")]
pub async fn list_permissions(auth: AdminAuth, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    auth.require(permissions::VIEW_GROUP)?;
    Ok(HttpResponse::Ok().json(groups::list_permissions(pool.connection()).await?))
}
