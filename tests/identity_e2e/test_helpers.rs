//! Shared test helpers for identity E2E tests.

use actix_web::cookie::Cookie;
use actix_web::{App, dev::ServiceResponse, test, web};
use serde_json::Value;
use shop_identity_lib::auth::AdminKey;
use shop_identity_lib::config::Config;
use shop_identity_lib::db::DbPool;
use shop_identity_lib::models::user::{ExtraUserFields, User};
use shop_identity_lib::services::avatar::AvatarFetcher;
use shop_identity_lib::services::session::{ACCESS_COOKIE, REFRESH_COOKIE};
use shop_identity_lib::services::storage::{AvatarStore, MemoryStore};
use shop_identity_lib::services::user_manager;
use shop_identity_lib::{api, services};
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

/// Admin key used in tests.
pub const TEST_ADMIN_KEY: &str = "test-admin-key-for-identity-e2e";

/// Password given to users created by the helpers.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

static MIGRATIONS_RUN: OnceLock<()> = OnceLock::new();

/// Load the test configuration.
pub fn test_config() -> Config {
    let mut config = Config::from_env().expect(
        "Failed to load config. Ensure RUST_ENV and DATABASE_URL are set, \
         and that PostgreSQL is running.",
    );
    config.database.max_connections = 2;
    config.database.min_connections = 1;
    config
}

/// Create a fresh DB pool. Migrations run only once.
pub async fn create_test_pool() -> DbPool {
    let pool = DbPool::new(&test_config())
        .await
        .expect("Failed to connect to database");

    if MIGRATIONS_RUN.get().is_none() {
        pool.run_migrations()
            .await
            .expect("Failed to run migrations");
        let _ = MIGRATIONS_RUN.set(());
    }

    pool
}

/// Generate a unique email address for test isolation.
pub fn unique_email(prefix: &str) -> String {
    format!(
        "{}-{}@example.com",
        prefix,
        Uuid::new_v4().to_string().split('-').next().unwrap()
    )
}

/// Create a regular user with [`TEST_PASSWORD`].
pub async fn create_user(pool: &DbPool, email: &str) -> User {
    user_manager::create_user(
        pool.connection(),
        Some(email),
        Some(TEST_PASSWORD),
        ExtraUserFields::default(),
    )
    .await
    .expect("Failed to create user")
}

/// Create a staff (non-superuser) account with [`TEST_PASSWORD`].
pub async fn create_staff_user(pool: &DbPool, email: &str) -> User {
    user_manager::create_user(
        pool.connection(),
        Some(email),
        Some(TEST_PASSWORD),
        ExtraUserFields {
            is_staff: Some(true),
            ..ExtraUserFields::default()
        },
    )
    .await
    .expect("Failed to create staff user")
}

/// Create the full test app with an in-memory avatar store.
pub async fn create_test_app(
    pool: &DbPool,
    store: Arc<MemoryStore>,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse,
    Error = actix_web::Error,
> {
    create_test_app_with_config(pool, store, test_config()).await
}

/// Create the full test app with a caller-supplied configuration.
pub async fn create_test_app_with_config(
    pool: &DbPool,
    store: Arc<MemoryStore>,
    config: Config,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse,
    Error = actix_web::Error,
> {
    let fetcher = AvatarFetcher::new(5).expect("Failed to build fetcher");
    let admin_key = AdminKey::new(Some(TEST_ADMIN_KEY.to_string()));
    let store: Arc<dyn AvatarStore> = store;

    test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config))
            .app_data(web::Data::new(admin_key))
            .app_data(web::Data::new(fetcher))
            .app_data(web::Data::<dyn AvatarStore>::from(store))
            .service(
                web::scope("/api/v1")
                    .configure(api::configure_health_routes)
                    .configure(services::configure_session_routes)
                    .configure(services::configure_oauth_routes)
                    .configure(api::configure_account_routes)
                    .configure(api::configure_admin_routes),
            ),
    )
    .await
}

/// Session cookies returned by a successful login.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    pub access: String,
    pub refresh: String,
}

impl SessionCookies {
    pub fn access_cookie(&self) -> Cookie<'static> {
        Cookie::new(ACCESS_COOKIE, self.access.clone())
    }

    pub fn refresh_cookie(&self) -> Cookie<'static> {
        Cookie::new(REFRESH_COOKIE, self.refresh.clone())
    }
}

/// Pull the session cookies out of a response, if both are set.
pub fn session_cookies(resp: &ServiceResponse) -> Option<SessionCookies> {
    let find = |name: &str| {
        resp.response()
            .cookies()
            .find(|c| c.name() == name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    };
    Some(SessionCookies {
        access: find(ACCESS_COOKIE)?,
        refresh: find(REFRESH_COOKIE)?,
    })
}

/// Log in with email and password. Returns the status and the cookies on success.
pub async fn login<S>(app: &S, email: &str, password: &str) -> (u16, Option<SessionCookies>)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(serde_json::json!({ "email": email, "password": password }))
        .to_request();

    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    (status, session_cookies(&resp))
}

/// Log in and panic unless it succeeds.
pub async fn login_ok<S>(app: &S, email: &str) -> SessionCookies
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let (status, cookies) = login(app, email, TEST_PASSWORD).await;
    assert_eq!(status, 200, "Login should succeed for {}", email);
    cookies.expect("Login should set session cookies")
}

/// Send a request with the session cookie and return status and JSON body.
pub async fn call_as<S>(
    app: &S,
    session: &SessionCookies,
    req: test::TestRequest,
) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = req.cookie(session.access_cookie()).to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// Send a request with the admin key and return status and JSON body.
pub async fn call_as_admin<S>(app: &S, req: test::TestRequest) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = req.insert_header(("X-Admin-Key", TEST_ADMIN_KEY)).to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}
