//! Permission checks for the admin screens.

use std::collections::BTreeSet;

use crate::models::user::User;

pub const VIEW_USER: &str = "users.view_user";
pub const ADD_USER: &str = "users.add_user";
pub const CHANGE_USER: &str = "users.change_user";
pub const DELETE_USER: &str = "users.delete_user";
pub const VIEW_PROFILE: &str = "users.view_userprofile";
pub const CHANGE_PROFILE: &str = "users.change_userprofile";
pub const DELETE_PROFILE: &str = "users.delete_userprofile";
pub const VIEW_GROUP: &str = "auth.view_group";
pub const CHANGE_GROUP: &str = "auth.change_group";

/// Active superusers hold every permission. Other active users need the
/// codename among their direct or group permissions. Inactive users hold none.
pub fn has_perm(user: &User, effective: &BTreeSet<String>, codename: &str) -> bool {
    if !user.is_active {
        return false;
    }
    user.is_superuser || effective.contains(codename)
}

/// Staff access to the admin screens at all.
pub fn can_access_admin(user: &User) -> bool {
    user.is_active && user.is_staff
}
