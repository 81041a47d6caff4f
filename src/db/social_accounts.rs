//! Linked provider accounts.

use chrono::Utc;
use sea_orm::*;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::entity::social_account::{ActiveModel, Column, Entity};
use crate::error::AppResult;
use crate::models::SocialAccount;

pub async fn find_by_provider_uid<C: ConnectionTrait>(
    db: &C,
    provider: &str,
    uid: &str,
) -> AppResult<Option<SocialAccount>> {
    let result = Entity::find()
        .filter(Column::Provider.eq(provider))
        .filter(Column::Uid.eq(uid))
        .one(db)
        .await?;
    Ok(result.map(SocialAccount::from))
}

pub async fn list_for_user<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> AppResult<Vec<SocialAccount>> {
    let rows = Entity::find()
        .filter(Column::UserId.eq(user_id))
        .order_by_asc(Column::Provider)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(SocialAccount::from).collect())
}

/// Link `(provider, uid)` to a user, or refresh the stored payload and
/// login time if the link already exists.
pub async fn upsert<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    provider: &str,
    uid: &str,
    extra_data: JsonValue,
) -> AppResult<SocialAccount> {
    let now = Utc::now();

    let existing = Entity::find()
        .filter(Column::Provider.eq(provider))
        .filter(Column::Uid.eq(uid))
        .one(db)
        .await?;

    let model = match existing {
        Some(m) => {
            let mut active: ActiveModel = m.into();
            active.extra_data = Set(extra_data);
            active.last_login = Set(now);
            active.update(db).await?
        }
        None => {
            ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                provider: Set(provider.to_string()),
                uid: Set(uid.to_string()),
                extra_data: Set(extra_data),
                last_login: Set(now),
                date_joined: Set(now),
            }
            .insert(db)
            .await?
        }
    };

    Ok(model.into())
}
