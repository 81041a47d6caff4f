//! E2E tests: user creation rules against the database.

use shop_identity_lib::db::users;
use shop_identity_lib::error::AppError;
use shop_identity_lib::models::user::ExtraUserFields;
use shop_identity_lib::services::{password, user_manager};
use uuid::Uuid;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_create_user_derives_username_from_local_part() {
    let pool = create_test_pool().await;
    let email = unique_email("derive");

    let user = create_user(&pool, &email).await;

    let local = email.split('@').next().unwrap();
    assert_eq!(user.username, local);
    assert!(!user.is_staff);
    assert!(!user.is_superuser);
    assert!(user.is_active);
    assert_eq!(user.last_login, Some(user.date_joined));
}

#[actix_rt::test]
async fn test_create_user_hashes_password() {
    let pool = create_test_pool().await;
    let user = create_user(&pool, &unique_email("hash")).await;

    let hash = user.password_hash.as_deref().expect("password should be set");
    assert_ne!(hash, TEST_PASSWORD);
    assert!(password::verify_password(TEST_PASSWORD, hash));
}

#[actix_rt::test]
async fn test_create_user_without_password_is_unusable() {
    let pool = create_test_pool().await;
    let user = user_manager::create_user(
        pool.connection(),
        Some(&unique_email("nopass")),
        None,
        ExtraUserFields::default(),
    )
    .await
    .unwrap();

    assert!(!user.has_usable_password());
}

#[actix_rt::test]
async fn test_username_collision_gets_suffix() {
    let pool = create_test_pool().await;
    let local = format!("same-{}", &Uuid::new_v4().simple().to_string()[..8]);

    let first = create_user(&pool, &format!("{}@example.com", local)).await;
    let second = create_user(&pool, &format!("{}@example.org", local)).await;

    assert_eq!(first.username, local);
    assert_ne!(second.username, first.username);
    assert!(second.username.starts_with(&local));
}

#[actix_rt::test]
async fn test_email_domain_is_normalized_and_unique() {
    let pool = create_test_pool().await;
    let local = format!("Case{}", &Uuid::new_v4().simple().to_string()[..8]);

    let user = create_user(&pool, &format!("{}@EXAMPLE.COM", local)).await;
    assert_eq!(user.email, format!("{}@example.com", local));

    let duplicate = user_manager::create_user(
        pool.connection(),
        Some(&format!("{}@example.com", local.to_lowercase())),
        Some(TEST_PASSWORD),
        ExtraUserFields::default(),
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let found = users::find_by_email(pool.connection(), &user.email.to_uppercase())
        .await
        .unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));
}

#[actix_rt::test]
async fn test_missing_email_is_rejected() {
    let pool = create_test_pool().await;

    let result = user_manager::create_user(
        pool.connection(),
        None,
        Some(TEST_PASSWORD),
        ExtraUserFields::default(),
    )
    .await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));

    let result = user_manager::create_user(
        pool.connection(),
        Some("   "),
        Some(TEST_PASSWORD),
        ExtraUserFields::default(),
    )
    .await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));
}

#[actix_rt::test]
async fn test_create_superuser_sets_flags() {
    let pool = create_test_pool().await;

    let user = user_manager::create_superuser(
        pool.connection(),
        Some(&unique_email("super")),
        Some(TEST_PASSWORD),
        ExtraUserFields::default(),
    )
    .await
    .unwrap();

    assert!(user.is_staff);
    assert!(user.is_superuser);
    assert!(user.is_active);
}

#[actix_rt::test]
async fn test_create_superuser_rejects_non_staff() {
    let pool = create_test_pool().await;
    let email = unique_email("badsuper");

    let result = user_manager::create_superuser(
        pool.connection(),
        Some(&email),
        Some(TEST_PASSWORD),
        ExtraUserFields {
            is_staff: Some(false),
            ..ExtraUserFields::default()
        },
    )
    .await;

    assert!(matches!(result, Err(AppError::InvalidInput(_))));
    assert!(
        users::find_by_email(pool.connection(), &email)
            .await
            .unwrap()
            .is_none(),
        "Nothing should be persisted"
    );
}
