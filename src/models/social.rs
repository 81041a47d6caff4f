//! Social login payloads and supported providers.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// OAuth providers the shop can sign users in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialProvider {
    Github,
    Google,
    Facebook,
    Linkedin,
    Twitter,
}

impl SocialProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Google => "google",
            Self::Facebook => "facebook",
            Self::Linkedin => "linkedin",
            Self::Twitter => "twitter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "github" => Some(Self::Github),
            "google" => Some(Self::Google),
            "facebook" => Some(Self::Facebook),
            "linkedin" => Some(Self::Linkedin),
            "twitter" => Some(Self::Twitter),
            _ => None,
        }
    }
}

impl std::fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A completed provider login: who the provider says the user is.
///
/// `provider` is kept as a string so payloads from providers without a
/// dedicated avatar rule still link accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialLogin {
    pub provider: String,
    pub uid: String,
    /// Raw userinfo document returned by the provider.
    pub extra_data: JsonValue,
}

impl SocialLogin {
    /// String field from the payload, if present and non-empty.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.extra_data
            .get(key)
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn email(&self) -> Option<&str> {
        self.field("email")
    }
}

/// Linked provider account stored for a user.
#[derive(Debug, Clone, Serialize)]
pub struct SocialAccount {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub provider: String,
    pub uid: String,
    pub extra_data: JsonValue,
    pub last_login: chrono::DateTime<chrono::Utc>,
    pub date_joined: chrono::DateTime<chrono::Utc>,
}

impl From<crate::entity::social_account::Model> for SocialAccount {
    fn from(m: crate::entity::social_account::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            provider: m.provider,
            uid: m.uid,
            extra_data: m.extra_data,
            last_login: m.last_login,
            date_joined: m.date_joined,
        }
    }
}

/// Linked account as shown to its owner. The raw provider payload is not exposed.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LinkedAccountResponse {
    pub provider: String,
    pub uid: String,
    pub last_login: chrono::DateTime<chrono::Utc>,
    pub date_joined: chrono::DateTime<chrono::Utc>,
}

impl From<SocialAccount> for LinkedAccountResponse {
    fn from(a: SocialAccount) -> Self {
        Self {
            provider: a.provider,
            uid: a.uid,
            last_login: a.last_login,
            date_joined: a.date_joined,
        }
    }
}
