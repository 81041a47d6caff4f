//! Per-user profile entity (one-to-one with users).

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub phone_number: Option<String>,
    pub country: Option<String>,
    #[sea_orm(unique)]
    pub shipping_address_id: Option<Uuid>,
    /// Storage key of the avatar image
    pub image: String,
    pub gender: Option<String>,
    pub description: Option<String>,
    pub order_history_id: Option<Uuid>,
    pub ip_address: String,
    pub loyalty_points: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
