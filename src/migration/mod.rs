//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_users;
mod m20261001_000002_create_groups_permissions;
mod m20261001_000003_create_user_profiles;
mod m20261001_000004_create_wishlist_items;
mod m20261001_000005_create_social_accounts;
mod m20261001_000006_create_refresh_tokens;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_users::Migration),
            Box::new(m20261001_000002_create_groups_permissions::Migration),
            Box::new(m20261001_000003_create_user_profiles::Migration),
            Box::new(m20261001_000004_create_wishlist_items::Migration),
            Box::new(m20261001_000005_create_social_accounts::Migration),
            Box::new(m20261001_000006_create_refresh_tokens::Migration),
        ]
    }
}
