//! Admin screen DTOs: user list/detail fieldsets, add form, profile editing, groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Pagination;
use crate::models::profile::{Gender, UserProfile};
use crate::models::user::User;

/// Query parameters of the user list screen.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct UserListQuery {
    /// Case-insensitive match against email, first name or last name
    pub search: Option<String>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_active: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// One row of the user list (list_display columns).
#[derive(Debug, Serialize, ToSchema)]
pub struct UserListItem {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<User> for UserListItem {
    fn from(u: User) -> Self {
        Self {
            id: u.id.to_string(),
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            is_staff: u.is_staff,
            is_superuser: u.is_superuser,
            is_active: u.is_active,
            date_joined: u.date_joined,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserListItem>,
    pub pagination: Pagination,
}

/// Reference to a group or permission in a fieldset.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupRef {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PermissionRef {
    pub id: i32,
    pub codename: String,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MainFieldset {
    pub email: String,
    /// Passwords are never returned; only whether one is set.
    pub has_usable_password: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PersonalInfoFieldset {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PermissionsFieldset {
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub groups: Vec<GroupRef>,
    pub user_permissions: Vec<PermissionRef>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportantDatesFieldset {
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

/// User detail screen, grouped into fieldsets.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserDetail {
    pub id: String,
    pub label: String,
    pub main: MainFieldset,
    pub personal_info: PersonalInfoFieldset,
    pub permissions: PermissionsFieldset,
    pub important_dates: ImportantDatesFieldset,
}

impl UserDetail {
    pub fn new(user: User, groups: Vec<GroupRef>, user_permissions: Vec<PermissionRef>) -> Self {
        Self {
            id: user.id.to_string(),
            label: user.to_string(),
            main: MainFieldset {
                has_usable_password: user.has_usable_password(),
                email: user.email,
            },
            personal_info: PersonalInfoFieldset {
                username: user.username,
                first_name: user.first_name,
                last_name: user.last_name,
            },
            permissions: PermissionsFieldset {
                is_staff: user.is_staff,
                is_superuser: user.is_superuser,
                is_active: user.is_active,
                groups,
                user_permissions,
            },
            important_dates: ImportantDatesFieldset {
                last_login: user.last_login,
                date_joined: user.date_joined,
            },
        }
    }
}

/// Add-user form: email plus password entered twice.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminCreateUserRequest {
    pub email: String,
    pub password1: String,
    pub password2: String,
}

/// Password pair used by the add form and the set-password screen.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPasswordRequest {
    pub password1: String,
    pub password2: String,
}

/// Check that both password entries match and satisfy the password rules.
pub fn clean_password_pair(password1: &str, password2: &str) -> AppResult<()> {
    if password1 != password2 {
        return Err(AppError::InvalidInput(
            "The two password fields didn't match".to_string(),
        ));
    }
    crate::services::password::validate_password(password1)
}

/// Full change form for a user (all fieldsets).
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminUpdateUserRequest {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    #[serde(default)]
    pub groups: Vec<i32>,
    #[serde(default)]
    pub user_permissions: Vec<i32>,
}

/// Profile row on the admin profile list.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminProfileItem {
    pub id: String,
    pub user_id: String,
    pub label: String,
    pub phone_number: Option<String>,
    pub country: Option<String>,
    pub shipping_address_id: Option<String>,
    pub image: String,
    pub gender: Option<Gender>,
    pub description: Option<String>,
    pub order_history_id: Option<String>,
    pub ip_address: String,
    pub loyalty_points: i32,
    pub wishlist: Vec<String>,
}

impl AdminProfileItem {
    pub fn new(profile: UserProfile, user_email: &str, wishlist: Vec<Uuid>) -> Self {
        Self {
            id: profile.id.to_string(),
            user_id: profile.user_id.to_string(),
            label: UserProfile::label(user_email),
            phone_number: profile.phone_number,
            country: profile.country,
            shipping_address_id: profile.shipping_address_id.map(|u| u.to_string()),
            image: profile.image,
            gender: profile.gender,
            description: profile.description,
            order_history_id: profile.order_history_id.map(|u| u.to_string()),
            ip_address: profile.ip_address,
            loyalty_points: profile.loyalty_points,
            wishlist: wishlist.into_iter().map(|u| u.to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminProfileListResponse {
    pub profiles: Vec<AdminProfileItem>,
    pub pagination: Pagination,
}

/// Full change form for a profile.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminProfileUpdate {
    pub phone_number: Option<String>,
    pub country: Option<String>,
    pub shipping_address_id: Option<Uuid>,
    pub image: Option<String>,
    pub gender: Option<Gender>,
    pub description: Option<String>,
    pub order_history_id: Option<Uuid>,
    pub ip_address: Option<String>,
    #[serde(default)]
    pub loyalty_points: i32,
    #[serde(default)]
    pub wishlist: Vec<Uuid>,
}

/// Validated profile changes ready to persist.
#[derive(Debug, Clone)]
pub struct ProfileChanges {
    pub phone_number: Option<String>,
    pub country: Option<String>,
    pub shipping_address_id: Option<Uuid>,
    pub image: String,
    pub gender: Option<Gender>,
    pub description: Option<String>,
    pub order_history_id: Option<Uuid>,
    pub ip_address: String,
    pub loyalty_points: i32,
}

impl AdminProfileUpdate {
    pub fn clean(&self, default_region: &str) -> AppResult<ProfileChanges> {
        let phone_number = match self.phone_number.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(crate::services::phone::normalize(raw, default_region)?),
        };
        let country = match self.country.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(code) => Some(crate::services::country::validate(code)?),
        };
        let ip_address = match self.ip_address.as_deref().map(str::trim) {
            None | Some("") => crate::models::profile::DEFAULT_IP_ADDRESS.to_string(),
            Some(raw) => raw
                .parse::<std::net::IpAddr>()
                .map(|ip| ip.to_string())
                .map_err(|_| {
                    AppError::InvalidInput("Enter a valid IPv4 or IPv6 address".to_string())
                })?,
        };
        if self.loyalty_points < 0 {
            return Err(AppError::InvalidInput(
                "loyalty_points cannot be negative".to_string(),
            ));
        }
        let image = match self.image.as_deref().map(str::trim) {
            None | Some("") => crate::models::profile::DEFAULT_IMAGE.to_string(),
            Some(key) => key.to_string(),
        };
        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(ProfileChanges {
            phone_number,
            country,
            shipping_address_id: self.shipping_address_id,
            image,
            gender: self.gender,
            description,
            order_history_id: self.order_history_id,
            ip_address,
            loyalty_points: self.loyalty_points,
        })
    }
}

/// Loyalty point adjustment (positive to award, negative to redeem).
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoyaltyAdjustRequest {
    pub delta: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoyaltyBalanceResponse {
    pub profile_id: String,
    pub loyalty_points: i32,
}

/// Group with its permission ids.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupResponse {
    pub id: i32,
    pub name: String,
    pub permissions: Vec<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetGroupPermissionsRequest {
    pub permissions: Vec<i32>,
}

/// Generic acknowledgement body.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
    pub id: String,
}
