//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models, services};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shop Identity Server",
        version = "0.1.0",
        description = "Shop accounts: email login, social login, profiles, wishlists and admin screens"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        api::health::info,
        // Session endpoints
        services::session::login,
        services::session::refresh,
        services::session::get_current_user,
        services::session::logout,
        // Social login
        services::oauth::social_login_redirect,
        services::oauth::social_login_callback,
        // Account
        api::account::get_account,
        api::account::update_account,
        api::account::update_contact,
        api::account::update_image,
        api::account::update_description,
        api::account::get_wishlist,
        api::account::add_to_wishlist,
        api::account::remove_from_wishlist,
        api::account::get_avatar,
        api::account::list_linked_accounts,
        // Admin: users
        api::admin_users::list_users,
        api::admin_users::create_user,
        api::admin_users::get_user,
        api::admin_users::update_user,
        api::admin_users::set_user_password,
        api::admin_users::delete_user,
        // Admin: profiles
        api::admin_profiles::list_profiles,
        api::admin_profiles::get_profile,
        api::admin_profiles::update_profile,
        api::admin_profiles::delete_profile,
        api::admin_profiles::adjust_loyalty_points,
        // Admin: groups
        api::admin_groups::list_groups,
        api::admin_groups::create_group,
        api::admin_groups::set_group_permissions,
        api::admin_groups::list_permissions,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            models::Pagination,
            models::PaginationParams,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            api::health::ServerInfoResponse,
            // Users and sessions
            models::user::LoginRequest,
            models::user::UserResponse,
            models::user::UserUpdateForm,
            // Profiles
            models::profile::Gender,
            models::profile::ProfileResponse,
            models::profile::AccountResponse,
            models::profile::ContactUpdateForm,
            models::profile::DescriptionUpdateForm,
            models::profile::WishlistResponse,
            models::social::LinkedAccountResponse,
            // Admin
            models::admin::UserListQuery,
            models::admin::UserListItem,
            models::admin::UserListResponse,
            models::admin::GroupRef,
            models::admin::PermissionRef,
            models::admin::MainFieldset,
            models::admin::PersonalInfoFieldset,
            models::admin::PermissionsFieldset,
            models::admin::ImportantDatesFieldset,
            models::admin::UserDetail,
            models::admin::AdminCreateUserRequest,
            models::admin::SetPasswordRequest,
            models::admin::AdminUpdateUserRequest,
            models::admin::AdminProfileItem,
            models::admin::AdminProfileListResponse,
            models::admin::AdminProfileUpdate,
            models::admin::LoyaltyAdjustRequest,
            models::admin::LoyaltyBalanceResponse,
            models::admin::GroupResponse,
            models::admin::CreateGroupRequest,
            models::admin::SetGroupPermissionsRequest,
            models::admin::MessageResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Email login, social login and session tokens"),
        (name = "Account", description = "Self-service account and profile forms"),
        (name = "Admin", description = "Admin screens for users, profiles and groups")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Admin key header and session cookie security schemes.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    crate::config::ADMIN_KEY_HEADER,
                ))),
            );
            components.add_security_scheme(
                "session",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                    services::session::ACCESS_COOKIE,
                ))),
            );
        }
    }
}
