//! Database operations for user profiles and their wishlists.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::entity::user_profile::{ActiveModel, Column, Entity};
use crate::entity::wishlist_item;
use crate::error::{AppError, AppResult};
use crate::models::admin::ProfileChanges;
use crate::models::profile::{DEFAULT_IMAGE, DEFAULT_IP_ADDRESS, Gender, UserProfile};
use crate::models::PaginationParams;

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<UserProfile>> {
    Ok(Entity::find_by_id(id).one(db).await?.map(UserProfile::from))
}

pub async fn find_by_user<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> AppResult<Option<UserProfile>> {
    let result = Entity::find()
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(result.map(UserProfile::from))
}

/// Fetch the user's profile, creating an empty one if missing.
///
/// Returns `(profile, created)`. A concurrent creator losing the unique
/// `user_id` race falls back to reading the winner's row.
pub async fn get_or_create<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> AppResult<(UserProfile, bool)> {
    if let Some(existing) = find_by_user(db, user_id).await? {
        return Ok((existing, false));
    }

    let now = Utc::now();
    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        phone_number: Set(None),
        country: Set(None),
        shipping_address_id: Set(None),
        image: Set(DEFAULT_IMAGE.to_string()),
        gender: Set(None),
        description: Set(None),
        order_history_id: Set(None),
        ip_address: Set(DEFAULT_IP_ADDRESS.to_string()),
        loyalty_points: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    };

    match model.insert(db).await {
        Ok(inserted) => Ok((inserted.into(), true)),
        Err(e) => match AppError::from(e) {
            AppError::Conflict(_) => {
                let existing = find_by_user(db, user_id)
                    .await?
                    .ok_or_else(|| AppError::Database("Profile vanished after conflict".into()))?;
                Ok((existing, false))
            }
            other => Err(other),
        },
    }
}

async fn load<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<ActiveModel> {
    Entity::find_by_id(id)
        .one(db)
        .await?
        .map(Into::into)
        .ok_or_else(|| AppError::NotFound("Profile".to_string()))
}

/// Save the contact form.
pub async fn update_contact<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    phone_number: String,
    country: Option<String>,
) -> AppResult<UserProfile> {
    let mut active = load(db, id).await?;
    active.phone_number = Set(Some(phone_number));
    active.country = Set(country);
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?.into())
}

/// Save the gender/image form. `image` is left unchanged when `None`.
pub async fn update_appearance<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    gender: Option<Gender>,
    image: Option<String>,
) -> AppResult<UserProfile> {
    let mut active = load(db, id).await?;
    active.gender = Set(gender.map(|g| g.as_code().to_string()));
    if let Some(key) = image {
        active.image = Set(key);
    }
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?.into())
}

pub async fn set_image<C: ConnectionTrait>(db: &C, id: Uuid, image: &str) -> AppResult<()> {
    Entity::update_many()
        .col_expr(Column::Image, Expr::value(image.to_string()))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn update_description<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    description: Option<String>,
) -> AppResult<UserProfile> {
    let mut active = load(db, id).await?;
    active.description = Set(description);
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?.into())
}

/// Record the address a profile was last seen from.
pub async fn set_ip_address<C: ConnectionTrait>(db: &C, id: Uuid, ip: &str) -> AppResult<()> {
    Entity::update_many()
        .col_expr(Column::IpAddress, Expr::value(ip.to_string()))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

/// Apply the admin change form (full replacement of editable columns).
pub async fn admin_update<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    changes: ProfileChanges,
) -> AppResult<UserProfile> {
    let mut active = load(db, id).await?;
    active.phone_number = Set(changes.phone_number);
    active.country = Set(changes.country);
    active.shipping_address_id = Set(changes.shipping_address_id);
    active.image = Set(changes.image);
    active.gender = Set(changes.gender.map(|g| g.as_code().to_string()));
    active.description = Set(changes.description);
    active.order_history_id = Set(changes.order_history_id);
    active.ip_address = Set(changes.ip_address);
    active.loyalty_points = Set(changes.loyalty_points);
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?.into())
}

/// Add `delta` points in a single statement, never dropping below zero.
pub async fn adjust_loyalty<C: ConnectionTrait>(db: &C, id: Uuid, delta: i32) -> AppResult<i32> {
    let result = Entity::update_many()
        .col_expr(
            Column::LoyaltyPoints,
            Expr::cust_with_values("GREATEST(loyalty_points + $1, 0)", [delta]),
        )
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Profile".to_string()));
    }

    let profile = find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile".to_string()))?;
    Ok(profile.loyalty_points)
}

/// Page of profiles with the owning user's email, newest first.
pub async fn list<C: ConnectionTrait>(
    db: &C,
    params: &PaginationParams,
) -> AppResult<(Vec<(UserProfile, String)>, u64)> {
    let total = Entity::find().count(db).await?;

    let rows = Entity::find()
        .order_by_desc(Column::CreatedAt)
        .offset(params.offset() as u64)
        .limit(params.clamped_limit() as u64)
        .all(db)
        .await?;

    let user_ids: Vec<Uuid> = rows.iter().map(|r| r.user_id).collect();
    let emails: HashMap<Uuid, String> = crate::db::users::find_many(db, &user_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.email))
        .collect();

    let profiles = rows
        .into_iter()
        .map(|m| {
            let email = emails.get(&m.user_id).cloned().unwrap_or_default();
            (UserProfile::from(m), email)
        })
        .collect();

    Ok((profiles, total))
}

pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<bool> {
    let result = Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected > 0)
}

/// Product ids on a profile's wishlist, oldest first.
pub async fn wishlist<C: ConnectionTrait>(db: &C, profile_id: Uuid) -> AppResult<Vec<Uuid>> {
    let rows = wishlist_item::Entity::find()
        .filter(wishlist_item::Column::ProfileId.eq(profile_id))
        .order_by_asc(wishlist_item::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|r| r.product_id).collect())
}

/// Add a product to the wishlist. Adding twice is a no-op.
pub async fn add_to_wishlist<C: ConnectionTrait>(
    db: &C,
    profile_id: Uuid,
    product_id: Uuid,
) -> AppResult<bool> {
    let existing = wishlist_item::Entity::find_by_id((profile_id, product_id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(false);
    }

    let model = wishlist_item::ActiveModel {
        profile_id: Set(profile_id),
        product_id: Set(product_id),
        created_at: Set(Utc::now()),
    };
    match wishlist_item::Entity::insert(model).exec(db).await {
        Ok(_) => Ok(true),
        Err(e) => match AppError::from(e) {
            AppError::Conflict(_) => Ok(false),
            other => Err(other),
        },
    }
}

pub async fn remove_from_wishlist<C: ConnectionTrait>(
    db: &C,
    profile_id: Uuid,
    product_id: Uuid,
) -> AppResult<bool> {
    let result = wishlist_item::Entity::delete_by_id((profile_id, product_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Replace the whole wishlist in one transaction.
pub async fn set_wishlist(
    db: &DatabaseConnection,
    profile_id: Uuid,
    product_ids: &[Uuid],
) -> AppResult<()> {
    let txn = db.begin().await?;

    wishlist_item::Entity::delete_many()
        .filter(wishlist_item::Column::ProfileId.eq(profile_id))
        .exec(&txn)
        .await?;

    let mut seen = std::collections::HashSet::new();
    let now = Utc::now();
    let rows: Vec<wishlist_item::ActiveModel> = product_ids
        .iter()
        .filter(|id| seen.insert(**id))
        .map(|product_id| wishlist_item::ActiveModel {
            profile_id: Set(profile_id),
            product_id: Set(*product_id),
            created_at: Set(now),
        })
        .collect();

    if !rows.is_empty() {
        wishlist_item::Entity::insert_many(rows).exec(&txn).await?;
    }

    txn.commit().await?;
    Ok(())
}
