//! Shop identity server - main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, web};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use shop_identity_lib::api::{self, ApiDoc};
use shop_identity_lib::auth::AdminKey;
use shop_identity_lib::config::Config;
use shop_identity_lib::db::DbPool;
use shop_identity_lib::middleware::RequestLogger;
use shop_identity_lib::services::{
    self, CleanupConfig, avatar::AvatarFetcher, storage::AvatarStore, storage::Storage,
};

/// Perform health check (for Docker healthcheck).
fn health_check() -> bool {
    Config::from_env().is_ok()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if health_check() { 0 } else { 1 });
    }

    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL and SHOP_SESSION_SECRET must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Shop Identity Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let pool = match DbPool::new(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    info!("Database connection established");

    if let Err(e) = pool.run_migrations().await {
        error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }
    info!("Database migrations complete");

    let store: Arc<dyn AvatarStore> = match Storage::new(&config.storage).await {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            error!("Failed to initialize avatar storage: {}", e);
            std::process::exit(1);
        }
    };

    let fetcher = match AvatarFetcher::new(config.avatar_fetch_timeout_secs) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Failed to build avatar HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let cleanup_config = CleanupConfig {
        interval_secs: if config.is_development() { 60 } else { 3600 },
        ..CleanupConfig::default()
    };
    services::start_cleanup_task(pool.clone(), cleanup_config);

    let bind_address = config.bind_address();
    let admin_key = AdminKey::new(config.admin_key.clone());
    if !admin_key.is_configured() {
        info!("No admin key configured; admin screens require a staff session");
    }
    let is_development = config.is_development();
    let max_avatar_size = config.max_avatar_size;

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!("Starting server at http://{} ({} workers)", bind_address, cpus);
        cpus
    };

    let config = web::Data::new(config);
    let pool = web::Data::new(pool);
    let admin_key = web::Data::new(admin_key);
    let fetcher = web::Data::new(fetcher);
    let store: web::Data<dyn AvatarStore> = web::Data::from(store);
    let openapi = ApiDoc::openapi();

    let server = HttpServer::new(move || {
        let cors = if is_development {
            Cors::default()
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .supports_credentials()
        } else {
            Cors::default()
        }
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-admin-key"),
        ])
        .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(RequestLogger)
            .app_data(config.clone())
            .app_data(pool.clone())
            .app_data(admin_key.clone())
            .app_data(fetcher.clone())
            .app_data(store.clone())
            // Multipart avatar uploads are bounded again in the handler
            .app_data(web::PayloadConfig::new(max_avatar_size * 2))
            .service(
                web::scope("/api/v1")
                    .configure(api::configure_health_routes)
                    .configure(services::configure_session_routes)
                    .configure(services::configure_oauth_routes)
                    .configure(api::configure_account_routes)
                    .configure(api::configure_admin_routes),
            )
            .service(
                SwaggerUi::new("/api/docs/{_:.*}").url("/api/docs/openapi.json", openapi.clone()),
            )
    });

    server.workers(worker_count).bind(&bind_address)?.run().await
}
