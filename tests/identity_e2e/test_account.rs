//! E2E tests: self-service account forms, wishlist and avatar.

use actix_web::test;
use serde_json::json;
use shop_identity_lib::services::storage::MemoryStore;
use std::sync::Arc;
use uuid::Uuid;

use super::test_helpers::*;

const BOUNDARY: &str = "----identity-e2e-boundary";

/// Build a multipart body with an optional `gender` field and an optional `image` file.
fn multipart_body(gender: Option<&str>, image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(gender) = gender {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"gender\"\r\n\r\n{gender}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, data)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(body: Vec<u8>) -> test::TestRequest {
    test::TestRequest::put()
        .uri("/api/v1/account/profile/image")
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(body)
}

#[actix_rt::test]
async fn test_account_requires_login() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;

    let req = test::TestRequest::get().uri("/api/v1/account").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[actix_rt::test]
async fn test_get_account_creates_missing_profile() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("acct");
    create_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;

    let (status, body) = call_as(&app, &session, test::TestRequest::get().uri("/api/v1/account")).await;

    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["user"]["email"], email);
    assert_eq!(body["profile"]["image"], "default.jpg");
    assert_eq!(body["profile"]["loyalty_points"], 0);
}

#[actix_rt::test]
async fn test_update_account_changes_names() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("rename");
    let user = create_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;

    let (status, body) = call_as(
        &app,
        &session,
        test::TestRequest::put().uri("/api/v1/account").set_json(json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": email,
            "username": user.username,
        })),
    )
    .await;

    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["first_name"], "Ada");
    assert_eq!(body["last_name"], "Lovelace");
}

#[actix_rt::test]
async fn test_update_account_rejects_taken_email() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let taken = unique_email("taken");
    create_user(&pool, &taken).await;
    let email = unique_email("mover");
    let user = create_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;

    let (status, _) = call_as(
        &app,
        &session,
        test::TestRequest::put().uri("/api/v1/account").set_json(json!({
            "first_name": "",
            "last_name": "",
            "email": taken,
            "username": user.username,
        })),
    )
    .await;

    assert_eq!(status, 409);
}

#[actix_rt::test]
async fn test_contact_form_normalizes_phone_and_country() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("contact");
    create_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;

    let (status, body) = call_as(
        &app,
        &session,
        test::TestRequest::put()
            .uri("/api/v1/account/profile/contact")
            .set_json(json!({ "phone_number": "+254 712 345 678", "country": "ke" })),
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["phone_number"], "+254712345678");
    assert_eq!(body["country"], "KE");

    let (status, _) = call_as(
        &app,
        &session,
        test::TestRequest::put()
            .uri("/api/v1/account/profile/contact")
            .set_json(json!({ "phone_number": "call me", "country": null })),
    )
    .await;
    assert_eq!(status, 400);
}

#[actix_rt::test]
async fn test_description_form_limits_length() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("desc");
    create_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;

    let (status, body) = call_as(
        &app,
        &session,
        test::TestRequest::put()
            .uri("/api/v1/account/profile/description")
            .set_json(json!({ "description": "  Loves tea  " })),
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["description"], "Loves tea");

    let (status, _) = call_as(
        &app,
        &session,
        test::TestRequest::put()
            .uri("/api/v1/account/profile/description")
            .set_json(json!({ "description": "x".repeat(2001) })),
    )
    .await;
    assert_eq!(status, 400);
}

#[actix_rt::test]
async fn test_wishlist_add_is_idempotent_and_remove_reports_missing() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("wish");
    create_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;
    let product = Uuid::new_v4().to_string();
    let uri = format!("/api/v1/account/wishlist/{}", product);

    for _ in 0..2 {
        let (status, body) = call_as(&app, &session, test::TestRequest::post().uri(&uri)).await;
        assert_eq!(status, 200, "{}", body);
        assert_eq!(body["product_ids"], json!([product]));
    }

    let (status, body) = call_as(&app, &session, test::TestRequest::delete().uri(&uri)).await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["product_ids"], json!([]));

    let (status, _) = call_as(&app, &session, test::TestRequest::delete().uri(&uri)).await;
    assert_eq!(status, 404);

    let (status, _) = call_as(
        &app,
        &session,
        test::TestRequest::post().uri("/api/v1/account/wishlist/not-a-uuid"),
    )
    .await;
    assert_eq!(status, 400);
}

#[actix_rt::test]
async fn test_image_upload_stores_avatar_and_replaces_previous() {
    let pool = create_test_pool().await;
    let store = Arc::new(MemoryStore::new());
    let app = create_test_app(&pool, store.clone()).await;
    let email = unique_email("image");
    create_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;

    // No custom avatar yet
    let req = test::TestRequest::get()
        .uri("/api/v1/account/avatar")
        .cookie(session.access_cookie())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);

    let (status, body) = call_as(
        &app,
        &session,
        multipart_request(multipart_body(Some("F"), Some(("me.png", b"first-image")))),
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["gender"], "F");
    let first_key = body["image"].as_str().unwrap().to_string();
    assert!(first_key.ends_with(".png"));
    assert!(store.contains(&first_key));

    let req = test::TestRequest::get()
        .uri("/api/v1/account/avatar")
        .cookie(session.access_cookie())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        "image/png"
    );
    let bytes = test::read_body(resp).await;
    assert_eq!(&bytes[..], b"first-image");

    let (status, body) = call_as(
        &app,
        &session,
        multipart_request(multipart_body(None, Some(("me.jpg", b"second-image")))),
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    let second_key = body["image"].as_str().unwrap();
    assert_ne!(second_key, first_key);
    assert!(store.contains(second_key));
    assert!(!store.contains(&first_key), "Replaced avatar should be deleted");
}

#[actix_rt::test]
async fn test_image_upload_rejects_bad_input() {
    let pool = create_test_pool().await;
    let store = Arc::new(MemoryStore::new());
    let app = create_test_app(&pool, store.clone()).await;
    let email = unique_email("badimg");
    create_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;

    let (status, _) = call_as(
        &app,
        &session,
        multipart_request(multipart_body(None, Some(("script.exe", b"MZ")))),
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = call_as(
        &app,
        &session,
        multipart_request(multipart_body(Some("Q"), None)),
    )
    .await;
    assert_eq!(status, 400);

    assert!(store.is_empty());
}

#[actix_rt::test]
async fn test_linked_accounts_empty_for_password_user() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("links");
    create_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;

    let (status, body) = call_as(
        &app,
        &session,
        test::TestRequest::get().uri("/api/v1/account/social-accounts"),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!([]));
}
