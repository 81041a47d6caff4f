//! Self-service account pages: the user form, the three profile forms,
//! the wishlist and the avatar.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, delete, get, post, put, web};
use futures_util::StreamExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::SessionAuth;
use crate::config::Config;
use crate::db::users::UserChanges;
use crate::db::{DbPool, profiles, social_accounts, users};
use crate::error::{AppError, AppResult};
use crate::models::profile::{
    AccountResponse, ContactUpdateForm, DescriptionUpdateForm, ProfileResponse, WishlistResponse,
};
use crate::models::social::LinkedAccountResponse;
use crate::models::user::UserUpdateForm;
use crate::models::{Gender, UserProfile, UserResponse};
use crate::services::storage::{self, AvatarStore};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_account)
        .service(update_account)
        .service(update_contact)
        .service(update_image)
        .service(update_description)
        .service(get_wishlist)
        .service(add_to_wishlist)
        .service(remove_from_wishlist)
        .service(get_avatar)
        .service(list_linked_accounts);
}

async fn own_profile(pool: &DbPool, auth: &SessionAuth) -> AppResult<UserProfile> {
    let (profile, created) = profiles::get_or_create(pool.connection(), auth.user.id).await?;
    if created {
        info!("Created missing profile for user {}", auth.user.id);
    }
    Ok(profile)
}

/// Current user and profile.
#[utoipa::path(
    get,
    path = "/api/v1/account",
    tag = "Account",
    responses(
        (status = 200, description = "Account", body = AccountResponse),
        (status = 401, description = "Login required", body = crate::error::ErrorResponse)
    )
)]
#[get("/account")]
pub async fn get_account(auth: SessionAuth, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let profile = own_profile(&pool, &auth).await?;
    Ok(HttpResponse::Ok().json(AccountResponse {
        user: auth.user.into(),
        profile: profile.into(),
    }))
}

/// Update name, email and username.
#[utoipa::path(
    put,
    path = "/api/v1/account",
    tag = "Account",
    request_body = UserUpdateForm,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Invalid field", body = crate::error::ErrorResponse),
        (status = 409, description = "Email or username taken", body = crate::error::ErrorResponse)
    )
)]
#[put("/account")]
pub async fn update_account(
    auth: SessionAuth,
    body: web::Json<UserUpdateForm>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let form = body.into_inner().clean()?;
    let db = pool.connection();
    let user = auth.user;

    if users::email_taken(db, &form.email, Some(user.id)).await? {
        return Err(AppError::Conflict(
            "User with this email address already exists".to_string(),
        ));
    }
    if users::username_exists(db, &form.username, Some(user.id)).await? {
        return Err(AppError::Conflict(
            "A user with that username already exists".to_string(),
        ));
    }

    let updated = users::update(
        db,
        user.id,
        UserChanges {
            email: form.email,
            username: form.username,
            first_name: form.first_name,
            last_name: form.last_name,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            is_active: user.is_active,
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}

/// Update phone number and country.
#[utoipa::path(
    put,
    path = "/api/v1/account/profile/contact",
    tag = "Account",
    request_body = ContactUpdateForm,
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 400, description = "Invalid phone number or country", body = crate::error::ErrorResponse)
    )
)]
#[put("/account/profile/contact")]
pub async fn update_contact(
    auth: SessionAuth,
    body: web::Json<ContactUpdateForm>,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let (phone, country) = body.clean(&config.default_phone_region)?;
    let profile = own_profile(&pool, &auth).await?;
    let updated = profiles::update_contact(pool.connection(), profile.id, phone, country).await?;
    Ok(HttpResponse::Ok().json(ProfileResponse::from(updated)))
}

async fn read_text_field(field: &mut actix_multipart::Field, limit: usize) -> AppResult<String> {
    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
        data.extend_from_slice(&chunk);
        if data.len() > limit {
            return Err(AppError::InvalidInput("Form field too long".to_string()));
        }
    }
    String::from_utf8(data).map_err(|_| AppError::InvalidInput("Form field is not UTF-8".into()))
}

/// Update gender and avatar image (multipart: `gender`, `image`).
#[utoipa::path(
    put,
    path = "/api/v1/account/profile/image",
    tag = "Account",
    request_body(content_type = "multipart/form-data", description = "`gender` (M/F/O or empty) and optional `image` file"),
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 400, description = "Invalid gender, file type or size", body = crate::error::ErrorResponse)
    )
)]
#[put("/account/profile/image")]
pub async fn update_image(
    auth: SessionAuth,
    mut payload: Multipart,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
    store: web::Data<dyn AvatarStore>,
) -> AppResult<HttpResponse> {
    let mut gender: Option<Gender> = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;
        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::InvalidInput("Missing content disposition".to_string()))?
            .clone();

        match content_disposition.get_name() {
            Some("gender") => {
                let raw = read_text_field(&mut field, 16).await?;
                gender = match raw.trim() {
                    "" => None,
                    code => Some(Gender::parse(code).ok_or_else(|| {
                        AppError::InvalidInput(format!(
                            "Select a valid choice. {} is not one of the available choices.",
                            code
                        ))
                    })?),
                };
            }
            Some("image") => {
                let filename = content_disposition.get_filename().unwrap_or("").to_string();
                let mut data = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk =
                        chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
                    data.extend_from_slice(&chunk);
                    if data.len() > config.max_avatar_size {
                        return Err(AppError::InvalidInput(format!(
                            "Image exceeds maximum size of {} bytes",
                            config.max_avatar_size
                        )));
                    }
                }
                if !filename.is_empty() && !data.is_empty() {
                    upload = Some((filename, data));
                }
            }
            _ => {
                while let Some(chunk) = field.next().await {
                    let _ = chunk;
                }
            }
        }
    }

    let profile = own_profile(&pool, &auth).await?;

    let new_key = match upload {
        Some((filename, data)) => {
            let ext = storage::image_extension(&filename).ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Upload a valid image. Allowed extensions: {}",
                    storage::ALLOWED_IMAGE_EXTENSIONS.join(", ")
                ))
            })?;
            let key = storage::uploaded_avatar_key(auth.user.id, &ext);
            store
                .put(&key, data, storage::content_type_for_extension(&ext))
                .await?;
            Some(key)
        }
        None => None,
    };

    let replaced = new_key
        .as_ref()
        .filter(|_| profile.has_custom_image())
        .map(|_| profile.image.clone());

    let updated =
        profiles::update_appearance(pool.connection(), profile.id, gender, new_key).await?;

    if let Some(old) = replaced {
        if let Err(e) = store.delete(&old).await {
            warn!("Failed to delete replaced avatar {}: {}", old, e);
        }
    }

    Ok(HttpResponse::Ok().json(ProfileResponse::from(updated)))
}

/// Update the free-text description.
#[utoipa::path(
    put,
    path = "/api/v1/account/profile/description",
    tag = "Account",
    request_body = DescriptionUpdateForm,
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 400, description = "Description too long", body = crate::error::ErrorResponse)
    )
)]
#[put("/account/profile/description")]
pub async fn update_description(
    auth: SessionAuth,
    body: web::Json<DescriptionUpdateForm>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let description = body.clean()?;
    let profile = own_profile(&pool, &auth).await?;
    let updated = profiles::update_description(pool.connection(), profile.id, description).await?;
    Ok(HttpResponse::Ok().json(ProfileResponse::from(updated)))
}

async fn wishlist_response(pool: &DbPool, profile_id: Uuid) -> AppResult<WishlistResponse> {
    let ids = profiles::wishlist(pool.connection(), profile_id).await?;
    Ok(WishlistResponse {
        product_ids: ids.into_iter().map(|id| id.to_string()).collect(),
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/account/wishlist",
    tag = "Account",
    responses((status = 200, description = "Wishlist", body = WishlistResponse))
)]
#[get("/account/wishlist")]
pub async fn get_wishlist(auth: SessionAuth, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let profile = own_profile(&pool, &auth).await?;
    Ok(HttpResponse::Ok().json(wishlist_response(&pool, profile.id).await?))
}

/// Add a product. Adding one that is already listed changes nothing.
#[utoipa::path(
    post,
    path = "/api/v1/account/wishlist/{product_id}",
    tag = "Account",
    params(("product_id" = String, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Wishlist", body = WishlistResponse),
        (status = 400, description = "Invalid product id", body = crate::error::ErrorResponse)
    )
)]
#[post("/account/wishlist/{product_id}")]
pub async fn add_to_wishlist(
    auth: SessionAuth,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let product_id = Uuid::parse_str(&path.into_inner())?;
    let profile = own_profile(&pool, &auth).await?;
    profiles::add_to_wishlist(pool.connection(), profile.id, product_id).await?;
    Ok(HttpResponse::Ok().json(wishlist_response(&pool, profile.id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/account/wishlist/{product_id}",
    tag = "Account",
    params(("product_id" = String, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Wishlist", body = WishlistResponse),
        (status = 404, description = "Product not on the wishlist", body = crate::error::ErrorResponse)
    )
)]
#[delete("/account/wishlist/{product_id}")]
pub async fn remove_from_wishlist(
    auth: SessionAuth,
    path: web::Path<String>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let product_id = Uuid::parse_str(&path.into_inner())?;
    let profile = own_profile(&pool, &auth).await?;
    if !profiles::remove_from_wishlist(pool.connection(), profile.id, product_id).await? {
        return Err(AppError::NotFound("Wishlist item".to_string()));
    }
    Ok(HttpResponse::Ok().json(wishlist_response(&pool, profile.id).await?))
}

/// Stream the stored avatar image.
#[utoipa::path(
    get,
    path = "/api/v1/account/avatar",
    tag = "Account",
    responses(
        (status = 200, description = "Avatar bytes"),
        (status = 404, description = "No avatar stored", body = crate::error::ErrorResponse)
    )
)]
#[get("/account/avatar")]
pub async fn get_avatar(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
    store: web::Data<dyn AvatarStore>,
) -> AppResult<HttpResponse> {
    let profile = own_profile(&pool, &auth).await?;
    if !profile.has_custom_image() {
        return Err(AppError::NotFound("Avatar".to_string()));
    }
    let (data, content_type) = store.get(&profile.image).await?;
    Ok(HttpResponse::Ok()
        .content_type(content_type.unwrap_or_else(|| "application/octet-stream".to_string()))
        .insert_header(("Cache-Control", "private, max-age=300"))
        .body(data))
}

/// Social accounts linked to the current user.
#[utoipa::path(
    get,
    path = "/api/v1/account/social-accounts",
    tag = "Account",
    responses((status = 200, description = "Linked accounts", body = [LinkedAccountResponse]))
)]
#[get("/account/social-accounts")]
pub async fn list_linked_accounts(
    auth: SessionAuth,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let accounts: Vec<LinkedAccountResponse> =
        social_accounts::list_for_user(pool.connection(), auth.user.id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
    Ok(HttpResponse::Ok().json(accounts))
}
