//! User creation: email normalization, username derivation and the
//! regular/superuser creation rules.

use sea_orm::DatabaseConnection;
use tracing::info;

use crate::db::users::{self as db, NewUserRecord};
use crate::error::{AppError, AppResult};
use crate::models::user::{ExtraUserFields, User};
use crate::services::password;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 30;
/// Maximum first/last name length.
pub const MAX_NAME_LENGTH: usize = 30;
/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Trim the address and lowercase its domain part. The local part is kept as typed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Structural email check: one `@`, non-empty local part, dotted domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LENGTH || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|l| {
            !l.is_empty()
                && !l.starts_with('-')
                && !l.ends_with('-')
                && l.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

/// Username base derived from an email: the local part, truncated.
pub fn username_base(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let cleaned: String = local
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '+' | '-' | '_'))
        .take(MAX_USERNAME_LENGTH)
        .collect();
    if cleaned.is_empty() {
        "user".to_string()
    } else {
        cleaned
    }
}

/// Candidate username for the n-th collision (`n >= 2`), kept within the length limit.
pub fn username_candidate(base: &str, n: u32) -> String {
    if n < 2 {
        return base.chars().take(MAX_USERNAME_LENGTH).collect();
    }
    let suffix = format!("-{}", n);
    let keep = MAX_USERNAME_LENGTH.saturating_sub(suffix.len());
    let head: String = base.chars().take(keep).collect();
    format!("{}{}", head, suffix)
}

/// Derive a free username from an email address.
pub async fn derive_username(db: &DatabaseConnection, email: &str) -> AppResult<String> {
    let base = username_base(email);
    for n in 1..1000 {
        let candidate = username_candidate(&base, n);
        if !db::username_exists(db, &candidate, None).await? {
            return Ok(candidate);
        }
    }
    Err(AppError::Conflict(format!(
        "No free username derived from '{}'",
        base
    )))
}

/// Create a regular user: not staff, not superuser, active.
///
/// A `None` password leaves the account without a usable password.
pub async fn create_user(
    db: &DatabaseConnection,
    email: Option<&str>,
    password: Option<&str>,
    extra: ExtraUserFields,
) -> AppResult<User> {
    let extra = ExtraUserFields {
        is_staff: Some(extra.is_staff.unwrap_or(false)),
        is_superuser: Some(extra.is_superuser.unwrap_or(false)),
        ..extra
    };
    create(db, email, password, extra).await
}

/// Create a superuser. Staff and superuser flags default to true and may not be turned off.
pub async fn create_superuser(
    db: &DatabaseConnection,
    email: Option<&str>,
    password: Option<&str>,
    extra: ExtraUserFields,
) -> AppResult<User> {
    let extra = superuser_fields(extra)?;
    create(db, email, password, extra).await
}

/// Apply superuser defaults and reject explicit `false` flags.
pub fn superuser_fields(extra: ExtraUserFields) -> AppResult<ExtraUserFields> {
    let is_staff = extra.is_staff.unwrap_or(true);
    let is_superuser = extra.is_superuser.unwrap_or(true);

    if !is_staff {
        return Err(AppError::InvalidInput(
            "Superuser must have is_staff=True.".to_string(),
        ));
    }
    if !is_superuser {
        return Err(AppError::InvalidInput(
            "Superuser must have is_superuser=True.".to_string(),
        ));
    }

    Ok(ExtraUserFields {
        is_staff: Some(true),
        is_superuser: Some(true),
        ..extra
    })
}

async fn create(
    db: &DatabaseConnection,
    email: Option<&str>,
    password: Option<&str>,
    extra: ExtraUserFields,
) -> AppResult<User> {
    let email = match email.map(normalize_email) {
        Some(e) if !e.is_empty() => e,
        _ => {
            return Err(AppError::InvalidInput(
                "Users must have an email address".to_string(),
            ));
        }
    };
    if !is_valid_email(&email) {
        return Err(AppError::InvalidInput(
            "Enter a valid email address".to_string(),
        ));
    }

    if db::find_by_email(db, &email).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "A user with email '{}' already exists",
            email
        )));
    }

    let first_name = truncate(extra.first_name.as_deref().unwrap_or(""), MAX_NAME_LENGTH);
    let last_name = truncate(extra.last_name.as_deref().unwrap_or(""), MAX_NAME_LENGTH);

    let password_hash = match password {
        Some(p) => Some(password::hash_password(p)?),
        None => None,
    };

    let username = derive_username(db, &email).await?;

    let user = db::insert(
        db,
        NewUserRecord {
            email,
            username,
            first_name,
            last_name,
            password_hash,
            is_staff: extra.is_staff.unwrap_or(false),
            is_superuser: extra.is_superuser.unwrap_or(false),
            is_active: extra.is_active.unwrap_or(true),
        },
    )
    .await?;

    info!(
        "Created user '{}' (id={}, staff={}, superuser={})",
        user.username, user.id, user.is_staff, user.is_superuser
    );

    Ok(user)
}

fn truncate(s: &str, max: usize) -> String {
    s.trim().chars().take(max).collect()
}
