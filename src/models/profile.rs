//! Profile models: per-user contact details, avatar, wishlist and loyalty points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Storage key used until a user uploads or links an avatar.
pub const DEFAULT_IMAGE: &str = "default.jpg";

/// Placeholder recorded until a request address is known.
pub const DEFAULT_IP_ADDRESS: &str = "0.0.0.0";

/// Gender choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O")]
    Other,
}

impl Gender {
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Other => "O",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "M" | "m" => Some(Self::Male),
            "F" | "f" => Some(Self::Female),
            "O" | "o" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
        }
    }
}

/// Profile stored in database.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub phone_number: Option<String>,
    pub country: Option<String>,
    pub shipping_address_id: Option<Uuid>,
    pub image: String,
    pub gender: Option<Gender>,
    pub description: Option<String>,
    pub order_history_id: Option<Uuid>,
    pub ip_address: String,
    pub loyalty_points: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Admin label, e.g. `jane@example.com Profile`.
    pub fn label(user_email: &str) -> String {
        format!("{} Profile", user_email)
    }

    pub fn has_custom_image(&self) -> bool {
        self.image != DEFAULT_IMAGE
    }
}

impl From<crate::entity::user_profile::Model> for UserProfile {
    fn from(m: crate::entity::user_profile::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            phone_number: m.phone_number,
            country: m.country,
            shipping_address_id: m.shipping_address_id,
            image: m.image,
            gender: m.gender.as_deref().and_then(Gender::parse),
            description: m.description,
            order_history_id: m.order_history_id,
            ip_address: m.ip_address,
            loyalty_points: m.loyalty_points,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Profile as returned to its owner.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: String,
    pub phone_number: Option<String>,
    pub country: Option<String>,
    pub image: String,
    pub gender: Option<Gender>,
    pub description: Option<String>,
    pub loyalty_points: i32,
}

impl From<UserProfile> for ProfileResponse {
    fn from(p: UserProfile) -> Self {
        Self {
            id: p.id.to_string(),
            phone_number: p.phone_number,
            country: p.country,
            image: p.image,
            gender: p.gender,
            description: p.description,
            loyalty_points: p.loyalty_points,
        }
    }
}

/// Contact form: phone number and country.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ContactUpdateForm {
    pub phone_number: String,
    pub country: Option<String>,
}

impl ContactUpdateForm {
    /// Validate and normalize. Returns the E.164 phone number and upper-cased country.
    pub fn clean(&self, default_region: &str) -> AppResult<(String, Option<String>)> {
        let phone = crate::services::phone::normalize(&self.phone_number, default_region)?;
        let country = match self.country.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(code) => Some(crate::services::country::validate(code)?),
        };
        Ok((phone, country))
    }
}

/// Description form.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DescriptionUpdateForm {
    pub description: Option<String>,
}

/// Maximum description length accepted by the description form.
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

impl DescriptionUpdateForm {
    pub fn clean(&self) -> AppResult<Option<String>> {
        match self.description.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) if text.chars().count() > MAX_DESCRIPTION_LENGTH => {
                Err(AppError::InvalidInput(format!(
                    "description must be at most {} characters",
                    MAX_DESCRIPTION_LENGTH
                )))
            }
            Some(text) => Ok(Some(text.to_string())),
        }
    }
}

/// Wishlist response.
#[derive(Debug, Serialize, ToSchema)]
pub struct WishlistResponse {
    pub product_ids: Vec<String>,
}

/// Account page: the user and their profile.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountResponse {
    pub user: crate::models::user::UserResponse,
    pub profile: ProfileResponse,
}
