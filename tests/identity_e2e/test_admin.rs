//! E2E tests: admin screens for users, profiles and groups.

use actix_web::test;
use serde_json::{Value, json};
use shop_identity_lib::db::profiles;
use shop_identity_lib::services::storage::MemoryStore;
use std::sync::Arc;
use uuid::Uuid;

use super::test_helpers::*;

fn unique_name(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

/// Permission id for a codename, looked up through the admin API.
async fn permission_id<S>(app: &S, codename: &str) -> i64
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let (status, body) =
        call_as_admin(app, test::TestRequest::get().uri("/api/v1/admin/permissions")).await;
    assert_eq!(status, 200);
    body.as_array()
        .unwrap()
        .iter()
        .find(|p| p["codename"] == codename)
        .and_then(|p| p["id"].as_i64())
        .unwrap_or_else(|| panic!("permission {} should be seeded", codename))
}

#[actix_rt::test]
async fn test_admin_requires_credentials() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;

    let req = test::TestRequest::get().uri("/api/v1/admin/users").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/users")
        .insert_header(("X-Admin-Key", "wrong-key"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[actix_rt::test]
async fn test_non_staff_session_is_forbidden() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("customer");
    create_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;

    let (status, _) =
        call_as(&app, &session, test::TestRequest::get().uri("/api/v1/admin/users")).await;
    assert_eq!(status, 403);
}

#[actix_rt::test]
async fn test_staff_permissions_come_from_groups() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("staff");
    let staff = create_staff_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;

    let (status, _) =
        call_as(&app, &session, test::TestRequest::get().uri("/api/v1/admin/users")).await;
    assert_eq!(status, 403, "Staff without permissions sees nothing");

    let view_user = permission_id(&app, "users.view_user").await;
    let (status, group) = call_as_admin(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/admin/groups")
            .set_json(json!({ "name": unique_name("viewers"), "permissions": [view_user] })),
    )
    .await;
    assert_eq!(status, 201, "{}", group);

    let (status, body) = call_as_admin(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/v1/admin/users/{}", staff.id))
            .set_json(json!({
                "email": email,
                "username": staff.username,
                "is_staff": true,
                "is_superuser": false,
                "is_active": true,
                "groups": [group["id"]],
            })),
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["permissions"]["groups"][0]["id"], group["id"]);

    let (status, _) =
        call_as(&app, &session, test::TestRequest::get().uri("/api/v1/admin/users")).await;
    assert_eq!(status, 200);

    // Viewing does not grant deleting
    let (status, _) = call_as(
        &app,
        &session,
        test::TestRequest::delete().uri(&format!("/api/v1/admin/users/{}", staff.id)),
    )
    .await;
    assert_eq!(status, 403);
}

#[actix_rt::test]
async fn test_add_form_creates_user_with_profile() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("added");

    let (status, body) = call_as_admin(
        &app,
        test::TestRequest::post().uri("/api/v1/admin/users").set_json(json!({
            "email": email,
            "password1": TEST_PASSWORD,
            "password2": TEST_PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, 201, "{}", body);
    assert_eq!(body["main"]["email"], email);
    assert_eq!(body["main"]["has_usable_password"], true);
    assert_eq!(body["label"], format!("{} User", email));
    assert_eq!(body["permissions"]["is_staff"], false);

    let id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
    assert!(
        profiles::find_by_user(pool.connection(), id)
            .await
            .unwrap()
            .is_some()
    );

    // The new user can log in
    login_ok(&app, &email).await;

    let (status, _) = call_as_admin(
        &app,
        test::TestRequest::post().uri("/api/v1/admin/users").set_json(json!({
            "email": email,
            "password1": TEST_PASSWORD,
            "password2": TEST_PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, 409);
}

#[actix_rt::test]
async fn test_add_form_rejects_mismatched_passwords() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;

    let (status, body) = call_as_admin(
        &app,
        test::TestRequest::post().uri("/api/v1/admin/users").set_json(json!({
            "email": unique_email("mismatch"),
            "password1": TEST_PASSWORD,
            "password2": "something-else-entirely",
        })),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("didn't match"));
}

#[actix_rt::test]
async fn test_user_list_search_and_filters() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let marker = unique_name("findme");
    let email = format!("{}@example.com", marker);
    create_user(&pool, &email).await;

    let (status, body) = call_as_admin(
        &app,
        test::TestRequest::get().uri(&format!("/api/v1/admin/users?search={}", marker)),
    )
    .await;
    assert_eq!(status, 200);
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], email);
    assert_eq!(body["pagination"]["total"], 1);

    let (_, body) = call_as_admin(
        &app,
        test::TestRequest::get().uri(&format!(
            "/api/v1/admin/users?search={}&is_staff=true",
            marker
        )),
    )
    .await;
    assert_eq!(body["users"], json!([]));

    // LIKE wildcards are matched literally
    let (_, body) = call_as_admin(
        &app,
        test::TestRequest::get().uri("/api/v1/admin/users?search=%25%25nobody%25%25"),
    )
    .await;
    assert_eq!(body["users"], json!([]));
}

#[actix_rt::test]
async fn test_change_form_rejects_taken_username() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let holder = create_user(&pool, &unique_email("holder")).await;
    let email = unique_email("changer");
    let user = create_user(&pool, &email).await;

    let (status, _) = call_as_admin(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/v1/admin/users/{}", user.id))
            .set_json(json!({
                "email": email,
                "username": holder.username,
                "is_staff": false,
                "is_superuser": false,
                "is_active": true,
            })),
    )
    .await;
    assert_eq!(status, 409);

    let (status, _) = call_as_admin(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/v1/admin/users/{}", user.id))
            .set_json(json!({
                "email": email,
                "username": user.username,
                "is_staff": false,
                "is_superuser": false,
                "is_active": true,
                "groups": [i32::MAX],
            })),
    )
    .await;
    assert_eq!(status, 400);
}

#[actix_rt::test]
async fn test_set_password_revokes_sessions() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("pwreset");
    let user = create_user(&pool, &email).await;
    let session = login_ok(&app, &email).await;
    let new_password = "a-brand-new-password";

    let (status, _) = call_as_admin(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/v1/admin/users/{}/password", user.id))
            .set_json(json!({ "password1": new_password, "password2": new_password })),
    )
    .await;
    assert_eq!(status, 200);

    let (status, _) = login(&app, &email, TEST_PASSWORD).await;
    assert_eq!(status, 401);
    let (status, _) = login(&app, &email, new_password).await;
    assert_eq!(status, 200);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .cookie(session.refresh_cookie())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[actix_rt::test]
async fn test_delete_user_cascades_profile() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let user = create_user(&pool, &unique_email("doomed")).await;
    let (profile, _) = profiles::get_or_create(pool.connection(), user.id)
        .await
        .unwrap();

    let uri = format!("/api/v1/admin/users/{}", user.id);
    let (status, body) = call_as_admin(&app, test::TestRequest::delete().uri(&uri)).await;
    assert_eq!(status, 200, "{}", body);

    let (status, _) = call_as_admin(&app, test::TestRequest::get().uri(&uri)).await;
    assert_eq!(status, 404);
    assert!(
        profiles::find_by_id(pool.connection(), profile.id)
            .await
            .unwrap()
            .is_none()
    );

    let (status, _) = call_as_admin(&app, test::TestRequest::get().uri("/api/v1/admin/users/not-a-uuid")).await;
    assert_eq!(status, 400);
}

#[actix_rt::test]
async fn test_profile_change_form_and_loyalty_points() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let email = unique_email("profiled");
    let user = create_user(&pool, &email).await;
    let (profile, _) = profiles::get_or_create(pool.connection(), user.id)
        .await
        .unwrap();
    let uri = format!("/api/v1/admin/profiles/{}", profile.id);
    let product = Uuid::new_v4();

    let (status, body) = call_as_admin(
        &app,
        test::TestRequest::put().uri(&uri).set_json(json!({
            "phone_number": "0712345678",
            "country": "ke",
            "gender": "O",
            "ip_address": "::1",
            "loyalty_points": 10,
            "wishlist": [product, product],
        })),
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["label"], format!("{} Profile", email));
    assert_eq!(body["phone_number"], "+254712345678");
    assert_eq!(body["country"], "KE");
    assert_eq!(body["ip_address"], "::1");
    assert_eq!(body["wishlist"], json!([product.to_string()]));

    let adjust = |delta: i32| {
        test::TestRequest::post()
            .uri(&format!("{}/loyalty-points", uri))
            .set_json(json!({ "delta": delta }))
    };
    let (status, body) = call_as_admin(&app, adjust(5)).await;
    assert_eq!(status, 200);
    assert_eq!(body["loyalty_points"], 15);

    let (_, body) = call_as_admin(&app, adjust(-100)).await;
    assert_eq!(body["loyalty_points"], 0, "Balance stops at zero");

    let (status, _) = call_as_admin(
        &app,
        test::TestRequest::put().uri(&uri).set_json(json!({ "ip_address": "not-an-ip" })),
    )
    .await;
    assert_eq!(status, 400);

    let missing = format!("/api/v1/admin/profiles/{}/loyalty-points", Uuid::new_v4());
    let (status, _) = call_as_admin(
        &app,
        test::TestRequest::post().uri(&missing).set_json(json!({ "delta": 1 })),
    )
    .await;
    assert_eq!(status, 404);
}

#[actix_rt::test]
async fn test_profile_list_and_delete() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let user = create_user(&pool, &unique_email("listed")).await;
    let (profile, _) = profiles::get_or_create(pool.connection(), user.id)
        .await
        .unwrap();

    let (status, body) = call_as_admin(
        &app,
        test::TestRequest::get().uri("/api/v1/admin/profiles?page=1&limit=5"),
    )
    .await;
    assert_eq!(status, 200);
    assert!(body["profiles"].as_array().unwrap().len() <= 5);
    assert_eq!(body["pagination"]["limit"], 5);

    let uri = format!("/api/v1/admin/profiles/{}", profile.id);
    let (status, _) = call_as_admin(&app, test::TestRequest::delete().uri(&uri)).await;
    assert_eq!(status, 200);
    let (status, _) = call_as_admin(&app, test::TestRequest::delete().uri(&uri)).await;
    assert_eq!(status, 404);
}

#[actix_rt::test]
async fn test_group_screens() {
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, Arc::new(MemoryStore::new())).await;
    let name = unique_name("editors");
    let change_profile = permission_id(&app, "users.change_userprofile").await;

    let (status, group) = call_as_admin(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/admin/groups")
            .set_json(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(group["permissions"], json!([]));

    let (status, _) = call_as_admin(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/admin/groups")
            .set_json(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, 409);

    let perms_uri = format!("/api/v1/admin/groups/{}/permissions", group["id"]);
    let (status, body) = call_as_admin(
        &app,
        test::TestRequest::put()
            .uri(&perms_uri)
            .set_json(json!({ "permissions": [change_profile] })),
    )
    .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["permissions"], json!([change_profile]));

    let (status, _) = call_as_admin(
        &app,
        test::TestRequest::put()
            .uri(&perms_uri)
            .set_json(json!({ "permissions": [i32::MAX] })),
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = call_as_admin(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/v1/admin/groups/{}/permissions", i32::MAX))
            .set_json(json!({ "permissions": [] })),
    )
    .await;
    assert_eq!(status, 404);

    let (status, body) =
        call_as_admin(&app, test::TestRequest::get().uri("/api/v1/admin/groups")).await;
    assert_eq!(status, 200);
    let listed: Vec<&Value> = body
        .as_array()
        .unwrap()
        .iter()
        .filter(|g| g["name"] == name.as_str())
        .collect();
    assert_eq!(listed.len(), 1);
}
