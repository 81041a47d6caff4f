//! Business logic services.

pub mod avatar;
pub mod cleanup;
pub mod country;
pub mod oauth;
pub mod password;
pub mod permissions;
pub mod phone;
pub mod session;
pub mod social_login;
pub mod storage;
pub mod user_manager;

pub use cleanup::{CleanupConfig, start_cleanup_task};
pub use oauth::configure_routes as configure_oauth_routes;
pub use session::configure_routes as configure_session_routes;
