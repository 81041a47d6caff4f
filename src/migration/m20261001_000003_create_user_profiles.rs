//! Migration: Create user_profiles table.
//!
//! One row per user at most (unique user_id), removed with the user.

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
                CREATE TABLE user_profiles (
                    id UUID PRIMARY KEY,
                    user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                    phone_number VARCHAR(20),
                    country CHAR(2),
                    shipping_address_id UUID UNIQUE,
                    image VARCHAR(500) NOT NULL DEFAULT 'default.jpg',
                    gender CHAR(1) CHECK (gender IN ('M', 'F', 'O')),
                    description TEXT,
                    order_history_id UUID,
                    ip_address VARCHAR(45) NOT NULL DEFAULT '0.0.0.0',
                    loyalty_points INTEGER NOT NULL DEFAULT 0,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE TRIGGER update_user_profiles_updated_at
                    BEFORE UPDATE ON user_profiles
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
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
                DROP TRIGGER IF EXISTS update_user_profiles_updated_at ON user_profiles;
                DROP TABLE IF EXISTS user_profiles CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
