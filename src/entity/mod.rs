//! SeaORM entity definitions for PostgreSQL database.

pub mod group;
pub mod group_permission;
pub mod permission;
pub mod refresh_token;
pub mod social_account;
pub mod user;
pub mod user_group;
pub mod user_permission;
pub mod user_profile;
pub mod wishlist_item;
