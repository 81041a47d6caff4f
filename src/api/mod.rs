//! API endpoint modules.

pub mod account;
pub mod admin_groups;
pub mod admin_profiles;
pub mod admin_users;
pub mod health;
pub mod openapi;

pub use account::configure_routes as configure_account_routes;
pub use health::configure_health_routes;
pub use openapi::ApiDoc;

/// Register all admin screens.
pub fn configure_admin_routes(cfg: &mut actix_web::web::ServiceConfig) {
    admin_users::configure_routes(cfg);
    admin_profiles::configure_routes(cfg);
    admin_groups::configure_routes(cfg);
}
