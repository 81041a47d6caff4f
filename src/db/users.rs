//! Database operations for users.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::entity::user::{ActiveModel, Column, Entity};
use crate::error::{AppError, AppResult};
use crate::models::admin::UserListQuery;
use crate::models::user::User;
use crate::models::PaginationParams;

/// Values for a new user row.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
}

/// Editable user columns.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
}

/// Insert a user. `last_login` and `date_joined` are both set to now.
pub async fn insert<C: ConnectionTrait>(db: &C, record: NewUserRecord) -> AppResult<User> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let model = ActiveModel {
        id: Set(id),
        email: Set(record.email),
        username: Set(record.username),
        first_name: Set(record.first_name),
        last_name: Set(record.last_name),
        password_hash: Set(record.password_hash),
        is_staff: Set(record.is_staff),
        is_superuser: Set(record.is_superuser),
        is_active: Set(record.is_active),
        last_login: Set(Some(now)),
        date_joined: Set(now),
        created_at: Set(now),
        updated_at: Set(now),
    };

    Entity::insert(model).exec(db).await?;

    let inserted = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Database("Failed to fetch newly inserted user".to_string()))?;

    Ok(inserted.into())
}

/// Find a user by ID.
pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<Option<User>> {
    let result = Entity::find_by_id(id).one(db).await?;
    Ok(result.map(User::from))
}

/// Find a user by email, ignoring case.
pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> AppResult<Option<User>> {
    let result = Entity::find()
        .filter(Expr::cust_with_values(
            "LOWER(email) = LOWER($1)",
            [email.trim().to_string()],
        ))
        .one(db)
        .await?;

    Ok(result.map(User::from))
}

/// Whether a username is taken, optionally ignoring one user (for self-updates).
pub async fn username_exists<C: ConnectionTrait>(
    db: &C,
    username: &str,
    exclude: Option<Uuid>,
) -> AppResult<bool> {
    let mut query = Entity::find().filter(Column::Username.eq(username));
    if let Some(id) = exclude {
        query = query.filter(Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

/// Whether an email is taken by another user (case-insensitive).
pub async fn email_taken<C: ConnectionTrait>(
    db: &C,
    email: &str,
    exclude: Option<Uuid>,
) -> AppResult<bool> {
    Ok(match find_by_email(db, email).await? {
        Some(u) => Some(u.id) != exclude,
        None => false,
    })
}

/// Escape LIKE wildcards in user-provided search terms.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// List users for the admin screen, newest first.
pub async fn list<C: ConnectionTrait>(db: &C, query: &UserListQuery) -> AppResult<(Vec<User>, u64)> {
    let mut select = Entity::find();

    if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(term);
        select = select.filter(Expr::cust_with_values(
            "(email ILIKE $1 OR first_name ILIKE $2 OR last_name ILIKE $3)",
            [pattern.clone(), pattern.clone(), pattern],
        ));
    }
    if let Some(v) = query.is_staff {
        select = select.filter(Column::IsStaff.eq(v));
    }
    if let Some(v) = query.is_superuser {
        select = select.filter(Column::IsSuperuser.eq(v));
    }
    if let Some(v) = query.is_active {
        select = select.filter(Column::IsActive.eq(v));
    }

    let total = select.clone().count(db).await?;

    let params = PaginationParams::new(query.page, query.limit);
    let rows = select
        .order_by_desc(Column::DateJoined)
        .offset(params.offset() as u64)
        .limit(params.clamped_limit() as u64)
        .all(db)
        .await?;

    Ok((rows.into_iter().map(User::from).collect(), total))
}

/// Fetch several users by id.
pub async fn find_many<C: ConnectionTrait>(db: &C, ids: &[Uuid]) -> AppResult<Vec<User>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = Entity::find()
        .filter(Column::Id.is_in(ids.iter().copied()))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(User::from).collect())
}

/// Update the editable columns of a user.
pub async fn update<C: ConnectionTrait>(db: &C, id: Uuid, changes: UserChanges) -> AppResult<User> {
    let existing = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    let mut active: ActiveModel = existing.into();
    active.email = Set(changes.email);
    active.username = Set(changes.username);
    active.first_name = Set(changes.first_name);
    active.last_name = Set(changes.last_name);
    active.is_staff = Set(changes.is_staff);
    active.is_superuser = Set(changes.is_superuser);
    active.is_active = Set(changes.is_active);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    Ok(updated.into())
}

/// Update only the username.
pub async fn set_username<C: ConnectionTrait>(db: &C, id: Uuid, username: &str) -> AppResult<User> {
    let existing = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    let mut active: ActiveModel = existing.into();
    active.username = Set(username.to_string());
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?.into())
}

/// Replace the password hash (`None` makes the password unusable).
pub async fn set_password_hash<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    password_hash: Option<String>,
) -> AppResult<()> {
    let existing = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    let mut active: ActiveModel = existing.into();
    active.password_hash = Set(password_hash);
    active.updated_at = Set(Utc::now());
    active.update(db).await?;
    Ok(())
}

/// Record a successful login.
pub async fn touch_last_login<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<()> {
    Entity::update_many()
        .col_expr(Column::LastLogin, Expr::value(Some(Utc::now())))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

/// Delete a user. Profile, group links and tokens cascade.
pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<bool> {
    let result = Entity::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected > 0)
}

/// Count superusers that are still active.
pub async fn count_active_superusers<C: ConnectionTrait>(db: &C) -> AppResult<u64> {
    Ok(Entity::find()
        .filter(Column::IsSuperuser.eq(true))
        .filter(Column::IsActive.eq(true))
        .count(db)
        .await?)
}
