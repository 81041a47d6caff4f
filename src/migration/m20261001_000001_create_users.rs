//! Migration: Create users table.
//!
//! Email is the login identifier; username is derived from it at creation.

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
                CREATE OR REPLACE FUNCTION update_updated_at_column()
                RETURNS TRIGGER AS $$
                BEGIN
                    NEW.updated_at = NOW();
                    RETURN NEW;
                END;
                $$ LANGUAGE plpgsql;

                CREATE TABLE users (
                    id UUID PRIMARY KEY,
                    email VARCHAR(254) NOT NULL,
                    username VARCHAR(30) NOT NULL,
                    first_name VARCHAR(30) NOT NULL DEFAULT '',
                    last_name VARCHAR(30) NOT NULL DEFAULT '',
                    password_hash VARCHAR(255),
                    is_staff BOOLEAN NOT NULL DEFAULT FALSE,
                    is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
                    is_active BOOLEAN NOT NULL DEFAULT TRUE,
                    last_login TIMESTAMPTZ,
                    date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                -- Emails are stored normalized; compare case-insensitively
                CREATE UNIQUE INDEX idx_users_email_lower ON users(LOWER(email));
                CREATE UNIQUE INDEX idx_users_username ON users(username);

                -- Admin list filters
                CREATE INDEX idx_users_flags ON users(is_staff, is_superuser, is_active);
                CREATE INDEX idx_users_date_joined ON users(date_joined DESC);

                CREATE TRIGGER update_users_updated_at
                    BEFORE UPDATE ON users
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
                DROP TRIGGER IF EXISTS update_users_updated_at ON users;
                DROP TABLE IF EXISTS users CASCADE;
                DROP FUNCTION IF EXISTS update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }
}
