//! Migration: Create profile_wishlist_items table.
//!
//! Products live in the catalog service; product_id is opaque here.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE profile_wishlist_items (
                    profile_id UUID NOT NULL REFERENCES user_profiles(id) ON DELETE CASCADE,
                    product_id UUID NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    PRIMARY KEY (profile_id, product_id)
                );
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TABLE IF EXISTS profile_wishlist_items;
                "#,
            )
            .await?;

        Ok(())
    }
}
