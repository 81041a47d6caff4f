//! Groups, permissions and the user/group/permission link tables.

use sea_orm::*;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::entity::{group, group_permission, permission, user_group, user_permission};
use crate::error::{AppError, AppResult};
use crate::models::admin::{GroupRef, GroupResponse, PermissionRef};

fn permission_ref(m: permission::Model) -> PermissionRef {
    PermissionRef {
        id: m.id,
        codename: m.codename,
        name: m.name,
    }
}

/// All seeded permissions, ordered by codename.
pub async fn list_permissions<C: ConnectionTrait>(db: &C) -> AppResult<Vec<PermissionRef>> {
    let rows = permission::Entity::find()
        .order_by_asc(permission::Column::Codename)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(permission_ref).collect())
}

/// Reject ids that don't exist in `auth_permissions`.
pub async fn ensure_permissions_exist<C: ConnectionTrait>(db: &C, ids: &[i32]) -> AppResult<()> {
    let wanted: BTreeSet<i32> = ids.iter().copied().collect();
    if wanted.is_empty() {
        return Ok(());
    }
    let found = permission::Entity::find()
        .filter(permission::Column::Id.is_in(wanted.iter().copied()))
        .count(db)
        .await?;
    if found as usize != wanted.len() {
        return Err(AppError::InvalidInput(
            "Select a valid choice: unknown permission id".to_string(),
        ));
    }
    Ok(())
}

/// Reject ids that don't exist in `auth_groups`.
pub async fn ensure_groups_exist<C: ConnectionTrait>(db: &C, ids: &[i32]) -> AppResult<()> {
    let wanted: BTreeSet<i32> = ids.iter().copied().collect();
    if wanted.is_empty() {
        return Ok(());
    }
    let found = group::Entity::find()
        .filter(group::Column::Id.is_in(wanted.iter().copied()))
        .count(db)
        .await?;
    if found as usize != wanted.len() {
        return Err(AppError::InvalidInput(
            "Select a valid choice: unknown group id".to_string(),
        ));
    }
    Ok(())
}

/// All groups with their permission ids.
pub async fn list_groups<C: ConnectionTrait>(db: &C) -> AppResult<Vec<GroupResponse>> {
    let groups = group::Entity::find()
        .order_by_asc(group::Column::Name)
        .all(db)
        .await?;
    let links = group_permission::Entity::find().all(db).await?;

    let mut by_group: HashMap<i32, Vec<i32>> = HashMap::new();
    for link in links {
        by_group.entry(link.group_id).or_default().push(link.permission_id);
    }

    Ok(groups
        .into_iter()
        .map(|g| {
            let mut permissions = by_group.remove(&g.id).unwrap_or_default();
            permissions.sort_unstable();
            GroupResponse {
                id: g.id,
                name: g.name,
                permissions,
            }
        })
        .collect())
}

pub async fn find_group<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<Option<GroupResponse>> {
    let Some(g) = group::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    let mut permissions: Vec<i32> = group_permission::Entity::find()
        .filter(group_permission::Column::GroupId.eq(id))
        .all(db)
        .await?
        .into_iter()
        .map(|l| l.permission_id)
        .collect();
    permissions.sort_unstable();
    Ok(Some(GroupResponse {
        id: g.id,
        name: g.name,
        permissions,
    }))
}

/// Create a group with an initial permission set.
pub async fn create_group(
    db: &DatabaseConnection,
    name: &str,
    permission_ids: &[i32],
) -> AppResult<GroupResponse> {
    ensure_permissions_exist(db, permission_ids).await?;

    let txn = db.begin().await?;
    let created = group::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    replace_group_permissions(&txn, created.id, permission_ids).await?;
    txn.commit().await?;

    find_group(db, created.id)
        .await?
        .ok_or_else(|| AppError::Database("Failed to fetch newly created group".to_string()))
}

/// Replace a group's permissions.
pub async fn set_group_permissions(
    db: &DatabaseConnection,
    group_id: i32,
    permission_ids: &[i32],
) -> AppResult<GroupResponse> {
    if group::Entity::find_by_id(group_id).one(db).await?.is_none() {
        return Err(AppError::NotFound("Group".to_string()));
    }
    ensure_permissions_exist(db, permission_ids).await?;

    let txn = db.begin().await?;
    replace_group_permissions(&txn, group_id, permission_ids).await?;
    txn.commit().await?;

    find_group(db, group_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Group".to_string()))
}

async fn replace_group_permissions<C: ConnectionTrait>(
    db: &C,
    group_id: i32,
    permission_ids: &[i32],
) -> AppResult<()> {
    group_permission::Entity::delete_many()
        .filter(group_permission::Column::GroupId.eq(group_id))
        .exec(db)
        .await?;

    let ids: BTreeSet<i32> = permission_ids.iter().copied().collect();
    if ids.is_empty() {
        return Ok(());
    }
    let rows = ids.into_iter().map(|permission_id| group_permission::ActiveModel {
        group_id: Set(group_id),
        permission_id: Set(permission_id),
    });
    group_permission::Entity::insert_many(rows).exec(db).await?;
    Ok(())
}

/// Replace a user's group memberships.
pub async fn set_user_groups<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    group_ids: &[i32],
) -> AppResult<()> {
    user_group::Entity::delete_many()
        .filter(user_group::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    let ids: BTreeSet<i32> = group_ids.iter().copied().collect();
    if ids.is_empty() {
        return Ok(());
    }
    let rows = ids.into_iter().map(|group_id| user_group::ActiveModel {
        user_id: Set(user_id),
        group_id: Set(group_id),
    });
    user_group::Entity::insert_many(rows).exec(db).await?;
    Ok(())
}

/// Replace a user's directly granted permissions.
pub async fn set_user_permissions<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    permission_ids: &[i32],
) -> AppResult<()> {
    user_permission::Entity::delete_many()
        .filter(user_permission::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    let ids: BTreeSet<i32> = permission_ids.iter().copied().collect();
    if ids.is_empty() {
        return Ok(());
    }
    let rows = ids.into_iter().map(|permission_id| user_permission::ActiveModel {
        user_id: Set(user_id),
        permission_id: Set(permission_id),
    });
    user_permission::Entity::insert_many(rows).exec(db).await?;
    Ok(())
}

pub async fn groups_for_user<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<Vec<GroupRef>> {
    let group_ids: Vec<i32> = user_group::Entity::find()
        .filter(user_group::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|l| l.group_id)
        .collect();
    if group_ids.is_empty() {
        return Ok(Vec::new());
    }

    let groups = group::Entity::find()
        .filter(group::Column::Id.is_in(group_ids))
        .order_by_asc(group::Column::Name)
        .all(db)
        .await?;
    Ok(groups
        .into_iter()
        .map(|g| GroupRef {
            id: g.id,
            name: g.name,
        })
        .collect())
}

/// Directly granted permissions (not including group permissions).
pub async fn permissions_for_user<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> AppResult<Vec<PermissionRef>> {
    let ids: Vec<i32> = user_permission::Entity::find()
        .filter(user_permission::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|l| l.permission_id)
        .collect();
    permissions_by_ids(db, ids).await
}

async fn permissions_by_ids<C: ConnectionTrait>(
    db: &C,
    ids: Vec<i32>,
) -> AppResult<Vec<PermissionRef>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = permission::Entity::find()
        .filter(permission::Column::Id.is_in(ids))
        .order_by_asc(permission::Column::Codename)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(permission_ref).collect())
}

/// Effective permission codenames: direct grants plus those of every group.
pub async fn effective_codenames<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> AppResult<BTreeSet<String>> {
    let mut ids: BTreeSet<i32> = user_permission::Entity::find()
        .filter(user_permission::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|l| l.permission_id)
        .collect();

    let group_ids: Vec<i32> = user_group::Entity::find()
        .filter(user_group::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|l| l.group_id)
        .collect();
    if !group_ids.is_empty() {
        let links = group_permission::Entity::find()
            .filter(group_permission::Column::GroupId.is_in(group_ids))
            .all(db)
            .await?;
        ids.extend(links.into_iter().map(|l| l.permission_id));
    }

    Ok(permissions_by_ids(db, ids.into_iter().collect())
        .await?
        .into_iter()
        .map(|p| p.codename)
        .collect())
}
