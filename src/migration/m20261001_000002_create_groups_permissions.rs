//! Migration: Create groups, permissions and their join tables.
//!
//! Seeds the permission rows the admin endpoints check.

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
                CREATE TABLE auth_groups (
                    id SERIAL PRIMARY KEY,
                    name VARCHAR(150) NOT NULL UNIQUE
                );

                CREATE TABLE auth_permissions (
                    id SERIAL PRIMARY KEY,
                    codename VARCHAR(100) NOT NULL UNIQUE,
                    name VARCHAR(255) NOT NULL
                );

                CREATE TABLE user_groups (
                    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    group_id INTEGER NOT NULL REFERENCES auth_groups(id) ON DELETE CASCADE,
                    PRIMARY KEY (user_id, group_id)
                );

                CREATE TABLE user_permissions (
                    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    permission_id INTEGER NOT NULL REFERENCES auth_permissions(id) ON DELETE CASCADE,
                    PRIMARY KEY (user_id, permission_id)
                );

                CREATE TABLE group_permissions (
                    group_id INTEGER NOT NULL REFERENCES auth_groups(id) ON DELETE CASCADE,
                    permission_id INTEGER NOT NULL REFERENCES auth_permissions(id) ON DELETE CASCADE,
                    PRIMARY KEY (group_id, permission_id)
                );

                INSERT INTO auth_permissions (codename, name) VALUES
                    ('users.view_user', 'Can view user'),
                    ('users.add_user', 'Can add user'),
                    ('users.change_user', 'Can change user'),
                    ('users.delete_user', 'Can delete user'),
                    ('users.view_userprofile', 'Can view user profile'),
                    ('users.change_userprofile', 'Can change user profile'),
                    ('users.delete_userprofile', 'Can delete user profile'),
                    ('auth.view_group', 'Can view group'),
                    ('auth.change_group', 'Can change group');
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
                DROP TABLE IF EXISTS group_permissions;
                DROP TABLE IF EXISTS user_permissions;
                DROP TABLE IF EXISTS user_groups;
                DROP TABLE IF EXISTS auth_permissions;
                DROP TABLE IF EXISTS auth_groups;
                "#,
            )
            .await?;

        Ok(())
    }
}
