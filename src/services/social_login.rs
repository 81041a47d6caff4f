//! Turns a completed provider login into a local user, profile and linked account.
//!
//! Runs on first login and on every later login through the same provider,
//! so the stored payload and avatar follow what the provider reports.

use sea_orm::DatabaseConnection;
use tracing::{debug, info, warn};

use crate::db::{profiles, social_accounts, users};
use crate::error::AppResult;
use crate::models::user::{ExtraUserFields, User, validate_username};
use crate::models::{SocialLogin, UserProfile};
use crate::services::avatar::{AvatarFetcher, resolve_avatar_url};
use crate::services::storage::{self, AvatarStore};
use crate::services::user_manager;

/// Result of processing a social login.
#[derive(Debug)]
pub struct SocialLoginOutcome {
    pub user: User,
    pub profile: UserProfile,
    /// The local user did not exist before this login.
    pub user_created: bool,
}

/// Find or create the user and profile for a provider login, then refresh
/// the username, avatar and linked account from the payload.
///
/// An existing `(provider, uid)` link wins over the payload's email, so a
/// provider-side email change keeps the same local user. Only a first login
/// without a usable email fails. Avatar problems are logged
/// and leave the current image in place.
pub async fn populate_user_profile(
    db: &DatabaseConnection,
    fetcher: &AvatarFetcher,
    store: &dyn AvatarStore,
    login: &SocialLogin,
) -> AppResult<SocialLoginOutcome> {
    let (mut user, user_created) = resolve_user(db, login).await?;

    let (mut profile, _) = profiles::get_or_create(db, user.id).await?;

    if let Some(requested) = login.field("username") {
        user = apply_username(db, user, requested).await?;
    }

    if let Some(url) = resolve_avatar_url(&login.provider, &login.uid, &login.extra_data) {
        match store_avatar(db, fetcher, store, &user, &profile, &url).await {
            Ok(key) => profile.image = key,
            Err(e) => warn!(
                "Keeping current avatar for user {} ({} login): {}",
                user.id, login.provider, e
            ),
        }
    }

    social_accounts::upsert(
        db,
        user.id,
        &login.provider,
        &login.uid,
        login.extra_data.clone(),
    )
    .await?;

    info!(
        "Social login via {} for user {} (created={})",
        login.provider, user.id, user_created
    );

    Ok(SocialLoginOutcome {
        user,
        profile,
        user_created,
    })
}

/// The user already linked to `(provider, uid)`, else the user owning the
/// payload's email, else a new passwordless user.
async fn resolve_user(db: &DatabaseConnection, login: &SocialLogin) -> AppResult<(User, bool)> {
    if let Some(link) =
        social_accounts::find_by_provider_uid(db, &login.provider, &login.uid).await?
    {
        if let Some(user) = users::find_by_id(db, link.user_id).await? {
            return Ok((user, false));
        }
    }

    let email = login.email();
    if let Some(e) = email {
        if let Some(user) = users::find_by_email(db, e).await? {
            return Ok((user, false));
        }
    }

    let extra = ExtraUserFields {
        first_name: login.field("first_name").map(String::from),
        last_name: login.field("last_name").map(String::from),
        ..Default::default()
    };
    let user = user_manager::create_user(db, email, None, extra).await?;
    Ok((user, true))
}

/// Take the provider's username when it is valid and nobody else holds it.
async fn apply_username(db: &DatabaseConnection, user: User, requested: &str) -> AppResult<User> {
    let requested = requested.trim();
    if requested == user.username {
        return Ok(user);
    }
    if let Err(e) = validate_username(requested) {
        debug!("Ignoring provider username '{}': {}", requested, e);
        return Ok(user);
    }
    if users::username_exists(db, requested, Some(user.id)).await? {
        debug!("Provider username '{}' is taken, keeping '{}'", requested, user.username);
        return Ok(user);
    }
    users::set_username(db, user.id, requested).await
}

async fn store_avatar(
    db: &DatabaseConnection,
    fetcher: &AvatarFetcher,
    store: &dyn AvatarStore,
    user: &User,
    profile: &UserProfile,
    url: &str,
) -> AppResult<String> {
    let (bytes, content_type) = fetcher.fetch(url).await?;
    let key = storage::social_avatar_key(user.id);
    let content_type = content_type
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or_else(|| "image/jpeg".to_string());

    store.put(&key, bytes, &content_type).await?;
    profiles::set_image(db, profile.id, &key).await?;

    if profile.has_custom_image() && profile.image != key {
        if let Err(e) = store.delete(&profile.image).await {
            warn!("Failed to delete replaced avatar {}: {}", profile.image, e);
        }
    }
    Ok(key)
}
