//! E2E tests: password login, token rotation, logout and the social login entry points.

use actix_web::test;
use secrecy::SecretString;
use serde_json::Value;
use shop_identity_lib::config::ProviderCredentials;
use shop_identity_lib::db::{profiles, users};
use shop_identity_lib::models::user::ExtraUserFields;
use shop_identity_lib::services::storage::MemoryStore;
use shop_identity_lib::services::user_manager;
use std::sync::Arc;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_health_and_info() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;

    for uri in ["/api/v1/health", "/api/v1/ready", "/api/v1/info"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200, "{} should answer", uri);
    }
}

#[actix_rt::test]
async fn test_login_sets_cookies_and_records_login() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("login");
    let user = create_user(&pool, &email).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .peer_addr("203.0.113.7:51000".parse().unwrap())
        .set_json(serde_json::json!({ "email": email, "password": TEST_PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert!(session_cookies(&resp).is_some());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["email"], email);
    assert!(body.get("password_hash").is_none());

    let stored = users::find_by_id(pool.connection(), user.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.last_login.is_some());

    let profile = profiles::find_by_user(pool.connection(), user.id)
        .await
        .unwrap()
        .expect("login should create the profile");
    assert_eq!(profile.ip_address, "203.0.113.7");
}

#[actix_rt::test]
async fn test_login_ignores_forwarded_for_header() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("forwarded");
    let user = create_user(&pool, &email).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .peer_addr("203.0.113.7:51000".parse().unwrap())
        .insert_header(("X-Forwarded-For", "198.51.100.9"))
        .insert_header(("Forwarded", "for=198.51.100.10"))
        .set_json(serde_json::json!({ "email": email, "password": TEST_PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);

    let profile = profiles::find_by_user(pool.connection(), user.id)
        .await
        .unwrap()
        .expect("login should create the profile");
    assert_eq!(profile.ip_address, "203.0.113.7");
}

#[actix_rt::test]
async fn test_login_rejects_wrong_password_and_unknown_email() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("wrongpw");
    create_user(&pool, &email).await;

    let (status, cookies) = login(&app, &email, "not-the-password").await;
    assert_eq!(status, 401);
    assert!(cookies.is_none());

    let (status, _) = login(&app, &unique_email("nobody"), TEST_PASSWORD).await;
    assert_eq!(status, 401);
}

#[actix_rt::test]
async fn test_login_rejects_inactive_and_passwordless_users() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;

    let inactive = unique_email("inactive");
    user_manager::create_user(
        pool.connection(),
        Some(&inactive),
        Some(TEST_PASSWORD),
        ExtraUserFields {
            is_active: Some(false),
            ..ExtraUserFields::default()
        },
    )
    .await
    .unwrap();
    let (status, _) = login(&app, &inactive, TEST_PASSWORD).await;
    assert_eq!(status, 401);

    let social_only = unique_email("social");
    user_manager::create_user(
        pool.connection(),
        Some(&social_only),
        None,
        ExtraUserFields::default(),
    )
    .await
    .unwrap();
    let (status, _) = login(&app, &social_only, "").await;
    assert_eq!(status, 401);
}

#[actix_rt::test]
async fn test_me_reports_user_or_null() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("me");
    create_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;

    let (status, body) = call_as(&app, &session, test::TestRequest::get().uri("/api/v1/auth/me")).await;
    assert_eq!(status, 200);
    assert_eq!(body["user"]["email"], email);

    let req = test::TestRequest::get().uri("/api/v1/auth/me").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["user"].is_null());
}

#[actix_rt::test]
async fn test_refresh_rotates_and_rejects_reuse() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("refresh");
    create_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .cookie(session.refresh_cookie())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let rotated = session_cookies(&resp).expect("refresh should issue a new pair");
    assert_ne!(rotated.refresh, session.refresh);

    // The consumed token cannot be used again
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .cookie(session.refresh_cookie())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);

    let req = test::TestRequest::post().uri("/api/v1/auth/refresh").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[actix_rt::test]
async fn test_logout_revokes_refresh_token() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("logout");
    create_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .cookie(session.access_cookie())
        .cookie(session.refresh_cookie())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert!(session_cookies(&resp).is_none(), "Cookies should be cleared");

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .cookie(session.refresh_cookie())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[actix_rt::test]
async fn test_deactivated_user_loses_session_immediately() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("deact");
    let user = create_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;

    let (status, _) = call_as_admin(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/v1/admin/users/{}", user.id))
            .set_json(serde_json::json!({
                "email": email,
                "username": user.username,
                "is_staff": false,
                "is_superuser": false,
                "is_active": false,
            })),
    )
    .await;
    assert_eq!(status, 200);

    let (status, _) = call_as(&app, &session, test::TestRequest::get().uri("/api/v1/account")).await;
    assert_eq!(status, 401);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .cookie(session.refresh_cookie())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[actix_rt::test]
async fn test_social_redirect_unknown_and_unconfigured_providers() {
    let pool = create_test_pool().await;
    let mut config = test_config();
    config.social.github = None;
    let app = create_test_app_with_config(&pool, Arc::new(MemoryStore::new()), config).await;

    let req = test::TestRequest::get().uri("/api/v1/auth/social/myspace").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);

    let req = test::TestRequest::get().uri("/api/v1/auth/social/github").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_rt::test]
async fn test_social_redirect_sets_state_and_pkce() {
    let pool = create_test_pool().await;
    let mut config = test_config();
    let credentials = ProviderCredentials {
        client_id: "test-client".to_string(),
        client_secret: SecretString::from("test-secret".to_string()),
    };
    config.social.google = Some(credentials.clone());
    config.social.twitter = Some(credentials);
    let app = create_test_app_with_config(&pool, Arc::new(MemoryStore::new()), config).await;

    let req = test::TestRequest::get().uri("/api/v1/auth/social/google").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 302);
    let location = resp.headers().get("location").unwrap().to_str().unwrap();
    assert!(location.starts_with("https://accounts.google.com/"));
    assert!(location.contains("client_id=test-client"));
    assert!(!location.contains("code_challenge"));
    let state = resp
        .response()
        .cookies()
        .find(|c| c.name() == "shop_oauth_state")
        .expect("state cookie");
    assert!(state.value().starts_with("google:"));

    let req = test::TestRequest::get().uri("/api/v1/auth/social/twitter").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 302);
    let location = resp.headers().get("location").unwrap().to_str().unwrap();
    assert!(location.contains("code_challenge_method=S256"));
    assert!(resp.response().cookies().any(|c| c.name() == "shop_oauth_pkce"));
}

#[actix_rt::test]
async fn test_social_callback_rejects_state_mismatch() {
    let pool = create_test_pool().await;
    let mut config = test_config();
    config.social.google = Some(ProviderCredentials {
        client_id: "test-client".to_string(),
        client_secret: SecretString::from("test-secret".to_string()),
    });
    let app = create_test_app_with_config(&pool, Arc::new(MemoryStore::new()), config).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/social/google/callback?code=abc&state=forged")
        .cookie(actix_web::cookie::Cookie::new("shop_oauth_state", "google:expected"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);

    let req = test::TestRequest::get()
        .uri("/api/v1/auth/social/google/callback?code=abc&state=expected")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
}
