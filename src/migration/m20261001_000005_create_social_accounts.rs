//! Migration: Create social_accounts table.
//!
//! Stores the raw provider payload of the latest login for each linked identity.

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
                CREATE TABLE social_accounts (
                    id UUID PRIMARY KEY,
                    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    provider VARCHAR(30) NOT NULL,
                    uid VARCHAR(191) NOT NULL,
                    extra_data JSONB NOT NULL DEFAULT '{}'::jsonb,
                    last_login TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    UNIQUE (provider, uid)
                );

                CREATE INDEX idx_social_accounts_user_id ON social_accounts(user_id);
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
                DROP TABLE IF EXISTS social_accounts;
                "#,
            )
            .await?;

        Ok(())
    }
}
