//! OAuth2 authorization-code login for the supported social providers.
//!
//! 1. GET /auth/social/{provider}: redirect to the provider with a CSRF `state`
//!    (and a PKCE S256 challenge for providers that require one)
//! 2. GET /auth/social/{provider}/callback: verify state, exchange the code,
//!    fetch the userinfo document, run the social-login handler, issue the
//!    session token pair and redirect to the configured landing page

use actix_web::cookie::{Cookie, SameSite};
use actix_web::{HttpRequest, HttpResponse, get, web};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{Config, ProviderCredentials};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{SocialLogin, SocialProvider};
use crate::services::avatar::AvatarFetcher;
use crate::services::session::{self, removal_cookie};
use crate::services::social_login;
use crate::services::storage::AvatarStore;

/// Stores `{provider}:{state}` between the redirect and the callback.
const OAUTH_STATE_COOKIE: &str = "shop_oauth_state";
/// PKCE code verifier for providers that use PKCE.
const OAUTH_PKCE_COOKIE: &str = "shop_oauth_pkce";
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "shop-identity";

/// Provider endpoints and request shape.
#[derive(Debug, Clone, Copy)]
pub struct ProviderEndpoints {
    pub authorize_url: &'static str,
    pub token_url: &'static str,
    pub userinfo_url: &'static str,
    pub scope: &'static str,
    pub pkce: bool,
    /// Send client credentials as HTTP basic auth rather than form fields.
    pub basic_auth: bool,
}

pub fn endpoints(provider: SocialProvider) -> ProviderEndpoints {
    match provider {
        SocialProvider::Github => ProviderEndpoints {
            authorize_url: "https://github.com/login/oauth/authorize",
            token_url: "https://github.com/login/oauth/access_token",
            userinfo_url: "https://api.github.com/user",
            scope: "read:user user:email",
            pkce: false,
            basic_auth: false,
        },
        SocialProvider::Google => ProviderEndpoints {
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth",
            token_url: "https://oauth2.googleapis.com/token",
            userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo",
            scope: "openid email profile",
            pkce: false,
            basic_auth: false,
        },
        SocialProvider::Facebook => ProviderEndpoints {
            authorize_url: "https://www.facebook.com/v19.0/dialog/oauth",
            token_url: "https://graph.facebook.com/v19.0/oauth/access_token",
            userinfo_url: "https://graph.facebook.com/v19.0/me?fields=id,email,first_name,last_name,name",
            scope: "email public_profile",
            pkce: false,
            basic_auth: false,
        },
        SocialProvider::Linkedin => ProviderEndpoints {
            authorize_url: "https://www.linkedin.com/oauth/v2/authorization",
            token_url: "https://www.linkedin.com/oauth/v2/accessToken",
            userinfo_url: "https://api.linkedin.com/v2/userinfo",
            scope: "openid profile email",
            pkce: false,
            basic_auth: false,
        },
        SocialProvider::Twitter => ProviderEndpoints {
            authorize_url: "https://twitter.com/i/oauth2/authorize",
            token_url: "https://api.twitter.com/2/oauth2/token",
            userinfo_url: "https://api.twitter.com/2/users/me?user.fields=profile_image_url,username,name",
            scope: "users.read tweet.read",
            pkce: true,
            basic_auth: true,
        },
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(social_login_redirect).service(social_login_callback);
}

fn build_http_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::Upstream(format!("Failed to build HTTP client: {}", e)))
}

fn generate_random_hex() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// PKCE code verifier: 32 random bytes, base64url without padding.
pub fn generate_code_verifier() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 code challenge for a verifier.
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn configured(
    config: &Config,
    provider: &str,
) -> AppResult<(SocialProvider, ProviderCredentials)> {
    let provider = SocialProvider::parse(provider)
        .ok_or_else(|| AppError::NotFound(format!("Provider '{}'", provider)))?;
    let credentials = config
        .social
        .credentials(provider)
        .cloned()
        .ok_or_else(|| AppError::InvalidInput("Provider not configured".to_string()))?;
    Ok((provider, credentials))
}

/// Authorization URL the browser is sent to.
pub fn authorize_url(
    provider: SocialProvider,
    client_id: &str,
    redirect_uri: &str,
    state: &str,
    challenge: Option<&str>,
) -> String {
    let ep = endpoints(provider);
    let mut url = format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&state={}&scope={}",
        ep.authorize_url,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(state),
        urlencoding::encode(ep.scope),
    );
    if let Some(challenge) = challenge {
        url.push_str("&code_challenge=");
        url.push_str(challenge);
        url.push_str("&code_challenge_method=S256");
    }
    url
}

fn short_lived_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(secure);
    cookie.set_max_age(actix_web::cookie::time::Duration::minutes(10));
    cookie
}

/// Redirect to the provider's authorization page.
#[utoipa::path(
    get,
    path = "/api/v1/auth/social/{provider}",
    tag = "Auth",
    params(("provider" = String, Path, description = "github, google, facebook, linkedin or twitter")),
    responses(
        (status = 302, description = "Redirect to the provider"),
        (status = 400, description = "Provider not configured", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown provider", body = crate::error::ErrorResponse)
    )
)]
#[get("/auth/social/{provider}")]
pub async fn social_login_redirect(
    path: web::Path<String>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let (provider, credentials) = configured(&config, &path.into_inner())?;
    let secure = config.environment.is_production();

    let state = generate_random_hex();
    let verifier = endpoints(provider).pkce.then(generate_code_verifier);
    let challenge = verifier.as_deref().map(code_challenge);

    let location = authorize_url(
        provider,
        &credentials.client_id,
        &config.social.callback_url(provider),
        &state,
        challenge.as_deref(),
    );

    let mut response = HttpResponse::Found();
    response.cookie(short_lived_cookie(
        OAUTH_STATE_COOKIE,
        format!("{}:{}", provider, state),
        secure,
    ));
    if let Some(verifier) = verifier {
        response.cookie(short_lived_cookie(OAUTH_PKCE_COOKIE, verifier, secure));
    }

    Ok(response.append_header(("Location", location)).finish())
}

#[derive(Debug, serde::Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

/// Complete a provider login.
#[utoipa::path(
    get,
    path = "/api/v1/auth/social/{provider}/callback",
    tag = "Auth",
    params(("provider" = String, Path, description = "Provider name")),
    responses(
        (status = 302, description = "Logged in; redirect to the landing page"),
        (status = 400, description = "Provider not configured or payload without email", body = crate::error::ErrorResponse),
        (status = 401, description = "State mismatch or provider rejected the login", body = crate::error::ErrorResponse)
    )
)]
#[get("/auth/social/{provider}/callback")]
pub async fn social_login_callback(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<CallbackQuery>,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
    fetcher: web::Data<AvatarFetcher>,
    store: web::Data<dyn AvatarStore>,
) -> AppResult<HttpResponse> {
    let (provider, credentials) = configured(&config, &path.into_inner())?;
    let failed = || AppError::Unauthorized(format!("{} authentication failed", provider));

    if let Some(ref err) = query.error {
        warn!("OAuth: {} returned error: {}", provider, err);
        return Err(failed());
    }

    let expected = req
        .cookie(OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| {
            warn!("OAuth callback: missing state cookie");
            AppError::Unauthorized("OAuth state verification failed".to_string())
        })?;
    let provided = format!("{}:{}", provider, query.state.as_deref().unwrap_or(""));
    if query.state.as_deref().unwrap_or("").is_empty() || provided != expected {
        warn!("OAuth callback: state mismatch for {}", provider);
        return Err(AppError::Unauthorized(
            "OAuth state verification failed".to_string(),
        ));
    }

    let code = query.code.as_deref().filter(|c| !c.is_empty()).ok_or_else(failed)?;
    let verifier = req.cookie(OAUTH_PKCE_COOKIE).map(|c| c.value().to_string());
    if endpoints(provider).pkce && verifier.is_none() {
        warn!("OAuth callback: missing PKCE verifier for {}", provider);
        return Err(failed());
    }

    let http = build_http_client()?;
    let access_token = exchange_code(
        &http,
        provider,
        &credentials,
        code,
        &config.social.callback_url(provider),
        verifier.as_deref(),
    )
    .await
    .map_err(|e| {
        warn!("OAuth: {} code exchange failed: {}", provider, e);
        failed()
    })?;

    let login = fetch_social_login(&http, provider, &access_token)
        .await
        .map_err(|e| {
            warn!("OAuth: {} userinfo fetch failed: {}", provider, e);
            failed()
        })?;

    let outcome =
        social_login::populate_user_profile(pool.connection(), &fetcher, store.get_ref(), &login)
            .await?;

    if !outcome.user.is_active {
        warn!("OAuth: inactive user {} tried to log in", outcome.user.id);
        return Err(AppError::Unauthorized("This account is inactive".to_string()));
    }

    session::record_login(&pool, &outcome.user, &req).await?;
    info!(
        "OAuth login via {}: user {} (created={})",
        provider, outcome.user.id, outcome.user_created
    );

    let secure = config.environment.is_production();
    let mut response = HttpResponse::Found();
    session::issue_token_pair(&mut response, &outcome.user, &config, &pool).await?;
    response.cookie(removal_cookie(OAUTH_STATE_COOKIE, secure));
    response.cookie(removal_cookie(OAUTH_PKCE_COOKIE, secure));

    Ok(response
        .append_header(("Location", config.social.login_redirect_url.clone()))
        .finish())
}

async fn exchange_code(
    http: &reqwest::Client,
    provider: SocialProvider,
    credentials: &ProviderCredentials,
    code: &str,
    redirect_uri: &str,
    verifier: Option<&str>,
) -> AppResult<SecretString> {
    let ep = endpoints(provider);

    let mut form: Vec<(&str, &str)> = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("client_id", credentials.client_id.as_str()),
    ];
    if !ep.basic_auth {
        form.push(("client_secret", credentials.client_secret.expose_secret()));
    }
    if let Some(verifier) = verifier {
        form.push(("code_verifier", verifier));
    }

    let mut request = http
        .post(ep.token_url)
        .header("Accept", "application/json")
        .form(&form);
    if ep.basic_auth {
        request = request.basic_auth(
            &credentials.client_id,
            Some(credentials.client_secret.expose_secret()),
        );
    }

    let token: TokenResponse = request.send().await?.json().await?;
    if let Some(err) = token.error {
        return Err(AppError::Upstream(format!("token endpoint error: {}", err)));
    }
    token
        .access_token
        .map(SecretString::from)
        .ok_or_else(|| AppError::Upstream("no access_token in token response".to_string()))
}

async fn get_json(http: &reqwest::Client, url: &str, token: &SecretString) -> AppResult<JsonValue> {
    let response = http
        .get(url)
        .bearer_auth(token.expose_secret())
        .header("Accept", "application/json")
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(AppError::Upstream(format!("{} returned {}", url, response.status())));
    }
    Ok(response.json().await?)
}

async fn fetch_social_login(
    http: &reqwest::Client,
    provider: SocialProvider,
    token: &SecretString,
) -> AppResult<SocialLogin> {
    let raw = get_json(http, endpoints(provider).userinfo_url, token).await?;
    let mut extra_data = unwrap_envelope(provider, raw);

    if provider == SocialProvider::Github && extra_data.get("email").is_none_or(JsonValue::is_null)
    {
        let emails = get_json(http, "https://api.github.com/user/emails", token).await?;
        if let Some(email) = primary_verified_email(&emails) {
            if let Some(obj) = extra_data.as_object_mut() {
                obj.insert("email".to_string(), JsonValue::String(email));
            }
        }
    }

    let uid = provider_uid(&extra_data)
        .ok_or_else(|| AppError::Upstream("userinfo has no id".to_string()))?;
    fill_name_fields(&mut extra_data);

    Ok(SocialLogin {
        provider: provider.as_str().to_string(),
        uid,
        extra_data,
    })
}

/// Twitter wraps the user in `{"data": {...}}`.
pub fn unwrap_envelope(provider: SocialProvider, raw: JsonValue) -> JsonValue {
    match (provider, raw) {
        (SocialProvider::Twitter, JsonValue::Object(mut obj)) if obj.contains_key("data") => {
            obj.remove("data").unwrap_or(JsonValue::Null)
        }
        (_, raw) => raw,
    }
}

/// Stable provider user id: `id` (GitHub, Facebook, Twitter) or `sub` (OIDC).
pub fn provider_uid(data: &JsonValue) -> Option<String> {
    ["id", "sub"].iter().find_map(|key| match data.get(*key)? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Primary verified address from GitHub's `/user/emails` list.
pub fn primary_verified_email(emails: &JsonValue) -> Option<String> {
    emails.as_array()?.iter().find_map(|e| {
        let primary = e.get("primary")?.as_bool()?;
        let verified = e.get("verified")?.as_bool()?;
        (primary && verified)
            .then(|| e.get("email")?.as_str().map(String::from))
            .flatten()
    })
}

/// Add `first_name`/`last_name` from OIDC claims or a display name when the
/// provider didn't send them. Existing keys are never overwritten.
pub fn fill_name_fields(data: &mut JsonValue) {
    let Some(obj) = data.as_object_mut() else {
        return;
    };
    if obj.contains_key("first_name") || obj.contains_key("last_name") {
        return;
    }

    let str_of = |key: &str| obj.get(key).and_then(JsonValue::as_str).map(String::from);
    let (first, last) = match (str_of("given_name"), str_of("family_name")) {
        (None, None) => match str_of("name") {
            Some(name) => {
                let name = name.trim().to_string();
                match name.split_once(' ') {
                    Some((f, l)) => (f.to_string(), l.trim().to_string()),
                    None => (name, String::new()),
                }
            }
            None => return,
        },
        (f, l) => (f.unwrap_or_default(), l.unwrap_or_default()),
    };

    obj.insert("first_name".to_string(), JsonValue::String(first));
    obj.insert("last_name".to_string(), JsonValue::String(last));
}
