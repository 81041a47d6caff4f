//! Provider avatar URL rules and the HTTP fetcher that downloads them.

use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::models::SocialProvider;

/// Upper bound on downloaded avatar size, independent of upload limits.
const MAX_FETCHED_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Avatar URL for a provider payload. `None` when the provider has no rule
/// or the payload carries no usable URL.
pub fn resolve_avatar_url(provider: &str, uid: &str, extra_data: &JsonValue) -> Option<String> {
    let url = match SocialProvider::parse(provider)? {
        SocialProvider::Facebook => {
            format!("http://graph.facebook.com/{}/picture?type=large", uid)
        }
        SocialProvider::Linkedin => extra_data
            .get("picture-urls")
            .and_then(|urls| urls.get("picture-url"))
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string(),
        SocialProvider::Twitter => {
            let raw = extra_data.get("profile_image_url").and_then(JsonValue::as_str)?;
            full_size_twitter_url(raw)?
        }
        SocialProvider::Google => string_field(extra_data, "picture"),
        SocialProvider::Github => string_field(extra_data, "avatar_url"),
    };

    (!url.is_empty()).then_some(url)
}

fn string_field(data: &JsonValue, key: &str) -> String {
    data.get(key)
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}

/// `…/abc_normal.jpg` -> `…/abc.jpg`: drop the last `_size` segment, keep the extension.
pub fn full_size_twitter_url(url: &str) -> Option<String> {
    let (stem, _) = url.rsplit_once('_')?;
    let (_, ext) = url.rsplit_once('.')?;
    Some(format!("{}.{}", stem, ext))
}

/// Downloads avatar images.
#[derive(Clone)]
pub struct AvatarFetcher {
    http: reqwest::Client,
}

impl AvatarFetcher {
    pub fn new(timeout_secs: u64) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Upstream(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Image bytes and the reported content type.
    pub async fn fetch(&self, url: &str) -> AppResult<(Vec<u8>, Option<String>)> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Avatar fetch returned {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = response.bytes().await?;
        if bytes.len() > MAX_FETCHED_AVATAR_BYTES {
            return Err(AppError::Upstream(format!(
                "Avatar is {} bytes, larger than {}",
                bytes.len(),
                MAX_FETCHED_AVATAR_BYTES
            )));
        }

        Ok((bytes.to_vec(), content_type))
    }
}
