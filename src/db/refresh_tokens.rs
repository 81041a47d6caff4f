//! Refresh token storage. Only SHA-256 digests are persisted.

use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::entity::refresh_token::{ActiveModel, Column, Entity};
use crate::error::AppResult;

const TOKEN_PREFIX: &str = "shop_rt_";

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Fresh opaque refresh token.
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    format!("{}{}", TOKEN_PREFIX, hex::encode(bytes))
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    token_hash: &str,
    ttl_secs: u64,
) -> AppResult<()> {
    let now = Utc::now();

    Entity::insert(ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        token_hash: Set(token_hash.to_string()),
        expires_at: Set(now + Duration::seconds(ttl_secs as i64)),
        revoked_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    })
    .exec(db)
    .await?;

    Ok(())
}

/// Revoke a live token and return its owner. Used for rotation, so a token
/// can be exchanged at most once.
pub async fn consume<C: ConnectionTrait>(db: &C, token_hash: &str) -> AppResult<Option<Uuid>> {
    let now = Utc::now();
    let Some(model) = Entity::find()
        .filter(Column::TokenHash.eq(token_hash))
        .filter(Column::RevokedAt.is_null())
        .filter(Column::DeletedAt.is_null())
        .filter(Column::ExpiresAt.gt(now))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    // Guarded on revoked_at so two concurrent refreshes cannot both win.
    let result = Entity::update_many()
        .col_expr(Column::RevokedAt, Expr::value(Some(now)))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(model.id))
        .filter(Column::RevokedAt.is_null())
        .exec(db)
        .await?;

    Ok((result.rows_affected == 1).then_some(model.user_id))
}

pub async fn revoke_by_hash<C: ConnectionTrait>(db: &C, token_hash: &str) -> AppResult<bool> {
    let result = Entity::update_many()
        .col_expr(Column::RevokedAt, Expr::value(Some(Utc::now())))
        .filter(Column::TokenHash.eq(token_hash))
        .filter(Column::RevokedAt.is_null())
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Revoke every live token of a user (password change, deactivation).
pub async fn revoke_all_for_user<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<u64> {
    let result = Entity::update_many()
        .col_expr(Column::RevokedAt, Expr::value(Some(Utc::now())))
        .filter(Column::UserId.eq(user_id))
        .filter(Column::RevokedAt.is_null())
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Soft-delete tokens that expired or were revoked before the cutoff.
pub async fn cleanup_expired<C: ConnectionTrait>(db: &C, older_than_secs: u64) -> AppResult<u64> {
    let now = Utc::now();
    let cutoff = now - Duration::seconds(older_than_secs as i64);

    let result = Entity::update_many()
        .filter(Column::DeletedAt.is_null())
        .filter(
            Condition::any()
                .add(Column::ExpiresAt.lt(cutoff))
                .add(Column::RevokedAt.lt(cutoff)),
        )
        .col_expr(Column::DeletedAt, Expr::value(Some(now)))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}
